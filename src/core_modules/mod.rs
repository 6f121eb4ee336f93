pub mod binarizer;
pub mod color;
pub mod component;
pub mod component_labeler;
pub mod frame;
pub mod frame_analyzer;
pub mod mask;
