// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 pica-core contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Scanline triangle rasterization
//!
//! Triangles arrive already projected to window coordinates. Vertices are
//! sorted by y and the triangle split at the middle vertex into a flat-bottom
//! and a flat-top half; each half is filled a scanline at a time. Pixel
//! centers at (x + 0.5, y + 0.5) inside the triangle are passed to the
//! fragment callback with perspective-correct attributes recovered from
//! barycentric weights on the 1/w-scaled values.

use crate::core::gpu::render::state::OutputVertex;

/// Perspective-correct per-fragment attributes
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub x: u32,
    pub y: u32,
    /// Window-space depth before the depth-range mapping
    pub depth: f32,
    pub color: [f32; 4],
    pub texcoord: [[f32; 2]; 3],
}

/// Twice the signed area of the triangle in window coordinates
///
/// Positive for counter-clockwise winding in a y-up coordinate system.
pub fn signed_area(v: &[OutputVertex; 3]) -> f32 {
    let [a, b, c] = [v[0].screen, v[1].screen, v[2].screen];
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Rasterize one screen-space triangle
///
/// `width`/`height` bound the framebuffer; `step` rasterizes every N-th
/// scanline (0 behaves as 1). The callback runs once per covered pixel.
pub fn rasterize<F: FnMut(Fragment)>(
    v: &[OutputVertex; 3],
    width: u32,
    height: u32,
    step: u32,
    fragment: &mut F,
) {
    let area = signed_area(v);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    let inv_area = 1.0 / area;
    let step = step.max(1) as usize;

    // Sort indices by window y for the scanline walk
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        v[a].screen[1]
            .partial_cmp(&v[b].screen[1])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let (top, mid, bot) = (v[order[0]], v[order[1]], v[order[2]]);

    let y_start = top.screen[1].ceil().max(0.0) as i64;
    let y_end = (bot.screen[1].ceil() as i64).min(height as i64);
    if y_start >= y_end {
        return;
    }

    // x on an edge at scanline center y, extrapolating degenerate edges
    // to an empty span
    let edge_x = |a: &OutputVertex, b: &OutputVertex, y: f32| -> f32 {
        let dy = b.screen[1] - a.screen[1];
        if dy.abs() < 1e-12 {
            a.screen[0]
        } else {
            a.screen[0] + (b.screen[0] - a.screen[0]) * (y - a.screen[1]) / dy
        }
    };

    for y in (y_start..y_end).step_by(step) {
        let yc = y as f32 + 0.5;
        // The long edge spans top to bottom; the other side changes at mid
        let x_long = edge_x(&top, &bot, yc);
        let x_short = if yc < mid.screen[1] {
            edge_x(&top, &mid, yc)
        } else {
            edge_x(&mid, &bot, yc)
        };
        let (mut x0, mut x1) = if x_long <= x_short {
            (x_long, x_short)
        } else {
            (x_short, x_long)
        };
        x0 = x0.max(0.0);
        x1 = x1.min(width as f32);
        let xi0 = x0.ceil() as i64;
        let xi1 = x1.ceil() as i64;

        for x in xi0..xi1 {
            let xc = x as f32 + 0.5;

            // Barycentric weights relative to the original vertex order
            let w0 = ((v[1].screen[0] - xc) * (v[2].screen[1] - yc)
                - (v[2].screen[0] - xc) * (v[1].screen[1] - yc))
                * inv_area;
            let w1 = ((v[2].screen[0] - xc) * (v[0].screen[1] - yc)
                - (v[0].screen[0] - xc) * (v[2].screen[1] - yc))
                * inv_area;
            let w2 = 1.0 - w0 - w1;

            // Scanline coverage can disagree with the weights by a ulp at
            // shared edges; nudge rather than drop the pixel.
            let (w0, w1, w2) = (w0.max(0.0), w1.max(0.0), w2.max(0.0));

            let inv_w = w0 * v[0].inv_w + w1 * v[1].inv_w + w2 * v[2].inv_w;
            if inv_w <= 0.0 {
                continue;
            }
            let depth =
                w0 * v[0].screen[2] + w1 * v[1].screen[2] + w2 * v[2].screen[2];

            let mut color = [0.0f32; 4];
            for (i, c) in color.iter_mut().enumerate() {
                *c = (w0 * v[0].color[i] * v[0].inv_w
                    + w1 * v[1].color[i] * v[1].inv_w
                    + w2 * v[2].color[i] * v[2].inv_w)
                    / inv_w;
            }
            let mut texcoord = [[0.0f32; 2]; 3];
            for unit in 0..3 {
                for i in 0..2 {
                    texcoord[unit][i] = (w0 * v[0].texcoord[unit][i] * v[0].inv_w
                        + w1 * v[1].texcoord[unit][i] * v[1].inv_w
                        + w2 * v[2].texcoord[unit][i] * v[2].inv_w)
                        / inv_w;
                }
            }
            fragment(Fragment {
                x: x as u32,
                y: y as u32,
                depth,
                color,
                texcoord,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vert(x: f32, y: f32, z: f32) -> OutputVertex {
        OutputVertex {
            screen: [x, y, z],
            inv_w: 1.0,
            ..Default::default()
        }
    }

    fn coverage(v: &[OutputVertex; 3]) -> Vec<(u32, u32)> {
        let mut pixels = Vec::new();
        rasterize(v, 64, 64, 1, &mut |f| pixels.push((f.x, f.y)));
        pixels
    }

    #[test]
    fn test_right_triangle_coverage() {
        // Axis-aligned right triangle covering half of a 4x4 square
        let tri = [vert(0.0, 0.0, 0.0), vert(4.0, 0.0, 0.0), vert(0.0, 4.0, 0.0)];
        let pixels = coverage(&tri);
        assert!(pixels.contains(&(0, 0)));
        assert!(pixels.contains(&(0, 3)));
        assert!(!pixels.contains(&(3, 3)));
        // Half of 16 pixels, give or take the diagonal rule
        assert!(pixels.len() >= 6 && pixels.len() <= 10, "{}", pixels.len());
    }

    #[test]
    fn test_degenerate_triangle_empty() {
        let tri = [vert(1.0, 1.0, 0.0), vert(5.0, 1.0, 0.0), vert(9.0, 1.0, 0.0)];
        assert!(coverage(&tri).is_empty());
    }

    #[test]
    fn test_offscreen_clamped() {
        let tri = [
            vert(-10.0, -10.0, 0.0),
            vert(100.0, -10.0, 0.0),
            vert(-10.0, 100.0, 0.0),
        ];
        let pixels = coverage(&tri);
        assert!(pixels.iter().all(|&(x, y)| x < 64 && y < 64));
        assert!(pixels.contains(&(0, 0)));
    }

    #[test]
    fn test_step_skips_scanlines() {
        let tri = [vert(0.0, 0.0, 0.0), vert(8.0, 0.0, 0.0), vert(0.0, 8.0, 0.0)];
        let mut rows = std::collections::BTreeSet::new();
        rasterize(&tri, 64, 64, 2, &mut |f| {
            rows.insert(f.y);
        });
        assert!(rows.iter().all(|r| r % 2 == 0));
        assert!(rows.len() >= 3);
    }

    #[test]
    fn test_perspective_correct_interpolation() {
        // Two vertices at w=1, one at w=0.5 (inv_w = 2): midpoints bias
        // toward the near vertex.
        let mut a = vert(0.0, 0.0, 0.0);
        a.color = [1.0, 0.0, 0.0, 1.0];
        let mut b = vert(8.0, 0.0, 0.0);
        b.color = [0.0, 1.0, 0.0, 1.0];
        b.inv_w = 2.0;
        let mut c = vert(0.0, 8.0, 0.0);
        c.color = [1.0, 0.0, 0.0, 1.0];

        let mut sample = None;
        rasterize(&[a, b, c], 64, 64, 1, &mut |f| {
            if f.x == 4 && f.y == 0 {
                sample = Some(f.color);
            }
        });
        let color = sample.expect("pixel (4, 0) covered");
        // Linear interpolation would give ~0.44 red; perspective correction
        // pulls it below.
        assert!(color[1] > color[0], "{color:?}");
    }

    #[test]
    fn test_signed_area_winding() {
        let ccw = [vert(0.0, 0.0, 0.0), vert(4.0, 0.0, 0.0), vert(0.0, 4.0, 0.0)];
        let cw = [ccw[0], ccw[2], ccw[1]];
        assert!(signed_area(&ccw) > 0.0);
        assert!(signed_area(&cw) < 0.0);
    }
}
