// THEORY:
// The `ComponentLabeler` is the spatial heart of the engine. It takes a binary mask
// and discovers every 4-connected region of matched cells, then reports which one
// is largest.
//
// Key architectural principles & algorithm steps:
// 1.  **Row-Major Seeding**: Cells are scanned y = 0..height, x = 0..width. The first
//     unvisited matched cell found becomes the seed of a new region.
// 2.  **Breadth-First Flood Fill**: From the seed, an explicit FIFO queue expands the
//     region through its up, down, left and right neighbors. Diagonals do not connect.
//     No recursion is used, so a region covering a whole 4K frame costs queue memory,
//     not call stack.
// 3.  **Flat Visited Arena**: A single `Vec<bool>` indexed by `y * width + x` records
//     every cell that has been enqueued. A cell is marked when it is enqueued, never
//     when it is dequeued, so each cell enters the queue at most once and the whole
//     labeling is O(width * height) in time and space.
// 4.  **Streaming Reduction**: While a region drains from the queue we only keep
//     running coordinate sums and a count. When the queue empties, the region is
//     reduced to a `Component` and its cells are forgotten.
// 5.  **Largest Wins, First Wins Ties**: Selection keeps a component only if it is
//     strictly larger than the best so far. Among equal-sized regions the one seeded
//     first in scan order is reported, which keeps results reproducible.

use crate::core_modules::component::{Centroid, Component};
use crate::core_modules::mask::BinaryMask;

pub mod component_labeler {
    use super::*;
    use std::collections::VecDeque;

    /// Up, down, left, right.
    const NEIGHBORS: [(i64, i64); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

    /// Returns the centroid of the largest 4-connected region of `true` cells, or
    /// `None` when no cell is set.
    ///
    /// Panics if `cells` does not hold exactly `width * height` entries.
    pub fn find_largest_component_centroid(
        cells: &[bool],
        width: u32,
        height: u32,
    ) -> Option<Centroid> {
        find_largest_component(cells, width, height).map(|c| c.centroid)
    }

    /// Like `find_largest_component_centroid`, but keeps the winning region's size.
    pub fn find_largest_component(cells: &[bool], width: u32, height: u32) -> Option<Component> {
        let mut largest: Option<Component> = None;
        flood_components(cells, width, height, |component| {
            let is_larger = largest.is_none_or(|best| component.size > best.size);
            if is_larger {
                largest = Some(component);
            }
        });
        largest
    }

    /// Every region in the order its seed was found.
    pub fn label_components(cells: &[bool], width: u32, height: u32) -> Vec<Component> {
        let mut components = Vec::new();
        flood_components(cells, width, height, |component| components.push(component));
        components
    }

    pub fn largest_in_mask(mask: &BinaryMask) -> Option<Component> {
        find_largest_component(&mask.cells, mask.width, mask.height)
    }

    fn flood_components(
        cells: &[bool],
        width: u32,
        height: u32,
        mut on_component: impl FnMut(Component),
    ) {
        let width = width as usize;
        let height = height as usize;
        assert_eq!(
            cells.len(),
            width * height,
            "dimension mismatch: {width}x{height} grid needs {} cells, mask has {}",
            width * height,
            cells.len()
        );

        let mut visited = vec![false; cells.len()];
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

        for y in 0..height {
            for x in 0..width {
                let index = y * width + x;
                if !cells[index] || visited[index] {
                    continue;
                }

                visited[index] = true;
                queue.push_back((x, y));

                let mut sum_x: u64 = 0;
                let mut sum_y: u64 = 0;
                let mut size: usize = 0;

                while let Some((cx, cy)) = queue.pop_front() {
                    sum_x += cx as u64;
                    sum_y += cy as u64;
                    size += 1;

                    for (dx, dy) in NEIGHBORS {
                        let nx = cx as i64 + dx;
                        let ny = cy as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                            continue;
                        }

                        let (nx, ny) = (nx as usize, ny as usize);
                        let neighbor = ny * width + nx;
                        if cells[neighbor] && !visited[neighbor] {
                            visited[neighbor] = true;
                            queue.push_back((nx, ny));
                        }
                    }
                }

                on_component(Component {
                    size,
                    centroid: Centroid::new(
                        sum_x as f64 / size as f64,
                        sum_y as f64 / size as f64,
                    ),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::component_labeler::*;
    use super::*;

    fn grid(rows: &[&str]) -> (Vec<bool>, u32, u32) {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        let cells = rows
            .iter()
            .flat_map(|row| row.chars().map(|c| c == '#'))
            .collect();
        (cells, width, height)
    }

    #[test]
    fn all_false_mask_has_no_centroid() {
        let (cells, w, h) = grid(&["....", "....", "...."]);
        assert_eq!(find_largest_component_centroid(&cells, w, h), None);
        assert!(label_components(&cells, w, h).is_empty());
    }

    #[test]
    fn empty_grid_has_no_centroid() {
        assert_eq!(find_largest_component_centroid(&[], 0, 0), None);
        assert_eq!(find_largest_component_centroid(&[], 5, 0), None);
    }

    #[test]
    fn single_cell_is_its_own_centroid() {
        let (cells, w, h) = grid(&["....", "..#.", "...."]);
        let component = find_largest_component(&cells, w, h).unwrap();
        assert_eq!(component.size, 1);
        assert_eq!(component.centroid, Centroid::new(2.0, 1.0));
    }

    #[test]
    fn two_cell_row_centroid_is_between_them() {
        let (cells, w, h) = grid(&["##.."]);
        let components = label_components(&cells, w, h);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].size, 2);
        assert_eq!(components[0].centroid, Centroid::new(0.5, 0.0));
    }

    #[test]
    fn rectangle_centroid_is_its_midpoint() {
        let (cells, w, h) = grid(&[
            "........",
            "..####..",
            "..####..",
            "..####..",
            "........",
        ]);
        let component = find_largest_component(&cells, w, h).unwrap();
        assert_eq!(component.size, 12);
        assert_eq!(component.centroid, Centroid::new((2.0 + 5.0) / 2.0, (1.0 + 3.0) / 2.0));
    }

    #[test]
    fn diagonal_cells_are_not_connected() {
        let (cells, w, h) = grid(&["#.", ".#"]);
        let components = label_components(&cells, w, h);
        assert_eq!(components.len(), 2);
        assert!(components.iter().all(|c| c.size == 1));
    }

    #[test]
    fn larger_block_wins_regardless_of_position() {
        let small_first = grid(&["##......", "##......", "....####", "....####"]);
        let large_first = grid(&["####....", "####....", "......##", "......##"]);

        let (cells, w, h) = small_first;
        let centroid = find_largest_component_centroid(&cells, w, h).unwrap();
        assert_eq!(centroid, Centroid::new(5.5, 2.5));

        let (cells, w, h) = large_first;
        let centroid = find_largest_component_centroid(&cells, w, h).unwrap();
        assert_eq!(centroid, Centroid::new(1.5, 0.5));
    }

    #[test]
    fn equal_sizes_keep_first_in_scan_order() {
        let (cells, w, h) = grid(&["...##", "#....", "#...."]);
        let components = label_components(&cells, w, h);
        assert_eq!(components.len(), 2);
        // The horizontal pair on row 0 is seeded before the vertical pair.
        let winner = find_largest_component(&cells, w, h).unwrap();
        assert_eq!(winner.centroid, Centroid::new(3.5, 0.0));
    }

    #[test]
    fn concave_region_is_one_component() {
        let (cells, w, h) = grid(&["#...#", "#...#", "#####"]);
        let components = label_components(&cells, w, h);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].size, 9);
    }

    #[test]
    fn sizes_cover_every_set_cell() {
        let (cells, w, h) = grid(&["#.#.#", ".#.#.", "#.#.#", "##..#"]);
        let total: usize = label_components(&cells, w, h).iter().map(|c| c.size).sum();
        assert_eq!(total, cells.iter().filter(|&&c| c).count());
    }

    #[test]
    fn large_full_frame_does_not_overflow_the_stack() {
        let (w, h) = (1920u32, 1080u32);
        let cells = vec![true; (w * h) as usize];
        let component = find_largest_component(&cells, w, h).unwrap();
        assert_eq!(component.size, (w * h) as usize);
        assert_eq!(component.centroid, Centroid::new(959.5, 539.5));
    }

    #[test]
    fn works_on_a_mask() {
        let mask = BinaryMask::new(3, 1, vec![false, true, true]);
        assert_eq!(largest_in_mask(&mask).unwrap().size, 2);
    }

    #[test]
    #[should_panic(expected = "dimension mismatch")]
    fn mismatched_dimensions_panic() {
        find_largest_component_centroid(&[true, false, true], 2, 2);
    }
}
