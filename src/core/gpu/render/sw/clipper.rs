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

//! Clip-space triangle clipping
//!
//! Sutherland-Hodgman polygon clipping against the view volume
//! `-w <= x, y, z <= w`, plus a small positive-w plane that
//! discards geometry behind the eye. A triangle clipped against all planes
//! produces at most nine vertices; callers triangulate the result as a fan.

use crate::core::gpu::render::state::OutputVertex;

/// One plane per clip-volume face, as a clip-space half-space
/// `dot(coeffs, position) >= 0`
const CLIP_PLANES: [[f32; 4]; 7] = [
    [-1.0, 0.0, 0.0, 1.0], // x <= w
    [1.0, 0.0, 0.0, 1.0],  // x >= -w
    [0.0, -1.0, 0.0, 1.0], // y <= w
    [0.0, 1.0, 0.0, 1.0],  // y >= -w
    [0.0, 0.0, -1.0, 1.0], // z <= w
    [0.0, 0.0, 1.0, 1.0],  // z >= -w
    [0.0, 0.0, 0.0, 1.0],  // w > 0, tightened below
];

/// Keeps vertices strictly in front of the eye so the perspective divide
/// stays finite
const W_EPSILON: f32 = 1e-5;

#[inline]
fn plane_distance(plane: &[f32; 4], v: &OutputVertex) -> f32 {
    let p = v.position;
    let bias = if plane[..3] == [0.0; 3] { -W_EPSILON } else { 0.0 };
    plane[0] * p[0] + plane[1] * p[1] + plane[2] * p[2] + plane[3] * p[3] + bias
}

/// Clip one triangle, appending the resulting polygon to `out`
///
/// `out` is cleared first. An empty result means the triangle was entirely
/// outside the view volume.
pub fn clip_triangle(vertices: &[OutputVertex; 3], out: &mut Vec<OutputVertex>) {
    out.clear();
    out.extend_from_slice(vertices);
    let mut scratch: Vec<OutputVertex> = Vec::with_capacity(9);

    for plane in &CLIP_PLANES {
        if out.is_empty() {
            return;
        }
        scratch.clear();
        for i in 0..out.len() {
            let current = &out[i];
            let next = &out[(i + 1) % out.len()];
            let d0 = plane_distance(plane, current);
            let d1 = plane_distance(plane, next);

            if d0 >= 0.0 {
                scratch.push(*current);
            }
            // Edge crosses the plane in either direction
            if (d0 >= 0.0) != (d1 >= 0.0) {
                let t = d0 / (d0 - d1);
                scratch.push(current.lerp(next, t));
            }
        }
        std::mem::swap(out, &mut scratch);
    }

    if out.len() > 9 {
        // Cannot happen for a triangle against 7 planes; guard for safety
        log::warn!("clipper produced {} vertices, truncating", out.len());
        out.truncate(9);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vert(x: f32, y: f32, z: f32, w: f32) -> OutputVertex {
        OutputVertex {
            position: [x, y, z, w],
            ..Default::default()
        }
    }

    #[test]
    fn test_fully_inside_passes_through() {
        let tri = [
            vert(0.0, 0.0, -0.5, 1.0),
            vert(0.5, 0.0, -0.5, 1.0),
            vert(0.0, 0.5, -0.5, 1.0),
        ];
        let mut out = Vec::new();
        clip_triangle(&tri, &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].position, tri[0].position);
    }

    #[test]
    fn test_inside_positive_z_passes_through() {
        // The near half of the volume, 0 < z <= w, keeps geometry too
        let tri = [
            vert(-0.5, -0.5, 0.5, 1.0),
            vert(0.5, -0.5, 0.5, 1.0),
            vert(0.0, 0.5, 0.5, 1.0),
        ];
        let mut out = Vec::new();
        clip_triangle(&tri, &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].position, tri[1].position);
    }

    #[test]
    fn test_past_near_plane_rejected() {
        let tri = [
            vert(-0.5, -0.5, 1.5, 1.0),
            vert(0.5, -0.5, 1.5, 1.0),
            vert(0.0, 0.5, 2.0, 1.0),
        ];
        let mut out = Vec::new();
        clip_triangle(&tri, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_fully_outside_rejected() {
        let tri = [
            vert(2.0, 0.0, -0.5, 1.0),
            vert(3.0, 0.0, -0.5, 1.0),
            vert(2.0, 1.0, -0.5, 1.0),
        ];
        let mut out = Vec::new();
        clip_triangle(&tri, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_one_vertex_clipped_yields_quad() {
        // One corner pokes past x = w; the polygon gains a vertex
        let tri = [
            vert(0.0, -0.5, -0.5, 1.0),
            vert(2.0, 0.0, -0.5, 1.0),
            vert(0.0, 0.5, -0.5, 1.0),
        ];
        let mut out = Vec::new();
        clip_triangle(&tri, &mut out);
        assert_eq!(out.len(), 4);
        for v in &out {
            assert!(v.position[0] <= v.position[3] + 1e-4);
        }
    }

    #[test]
    fn test_intersection_interpolates_attributes() {
        let mut a = vert(0.0, 0.0, -0.5, 1.0);
        a.color = [1.0, 0.0, 0.0, 1.0];
        let mut b = vert(2.0, 0.0, -0.5, 1.0);
        b.color = [0.0, 1.0, 0.0, 1.0];
        let c = vert(0.0, 0.5, -0.5, 1.0);
        let mut out = Vec::new();
        clip_triangle(&[a, b, c], &mut out);
        // The clipped edge midpoint-ish vertex carries blended color
        let blended = out
            .iter()
            .find(|v| (v.position[0] - 1.0).abs() < 1e-4)
            .expect("clip vertex on x = w");
        assert!((blended.color[0] - 0.5).abs() < 1e-4);
        assert!((blended.color[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_behind_eye_rejected() {
        let tri = [
            vert(0.0, 0.0, 0.5, -1.0),
            vert(1.0, 0.0, 0.5, -1.0),
            vert(0.0, 1.0, 0.5, -1.0),
        ];
        let mut out = Vec::new();
        clip_triangle(&tri, &mut out);
        assert!(out.is_empty());
    }
}
