// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator

use super::{Mesh, Triangle, Vertex};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Fallback tessellation when `$fn` is unset or zero
pub const DEFAULT_SEGMENTS: u32 = 32;

/// Upper bound on `$fn`; mesh sizes grow with its square for spheres
pub const MAX_SEGMENTS: u32 = 2048;

/// Geometric primitives understood by the script evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Cube { size: Vector3<f64>, center: bool },
    Sphere { r: f64, fn_: u32 },
    Cone { h: f64, r1: f64, r2: f64, fn_: u32, center: bool },
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn sphere(r: f64, fn_: u32) -> Self {
        Self::Sphere {
            r,
            fn_: segments(fn_),
        }
    }

    pub fn cylinder(h: f64, r: f64, fn_: u32, center: bool) -> Self {
        Self::cone(h, r, r, fn_, center)
    }

    pub fn cone(h: f64, r1: f64, r2: f64, fn_: u32, center: bool) -> Self {
        Self::Cone {
            h,
            r1,
            r2,
            fn_: segments(fn_),
            center,
        }
    }

    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Cube { size, center } => generate_cube_mesh(*size, *center),
            Self::Sphere { r, fn_ } => generate_sphere_mesh(*r, *fn_),
            Self::Cone {
                h,
                r1,
                r2,
                fn_,
                center,
            } => generate_cone_mesh(*h, *r1, *r2, *fn_, *center),
        }
    }
}

fn segments(fn_: u32) -> u32 {
    if fn_ >= 3 {
        fn_.min(MAX_SEGMENTS)
    } else {
        DEFAULT_SEGMENTS
    }
}

fn generate_cube_mesh(size: Vector3<f64>, center: bool) -> Mesh {
    let mut mesh = Mesh::with_capacity(24, 12);

    let min = if center { -size / 2.0 } else { Vector3::zeros() };
    let max = min + size;

    let positions = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    // Each face gets its own corners so normals stay flat
    let faces = [
        ([4, 5, 6, 7], Vector3::new(0.0, 0.0, 1.0)),
        ([1, 0, 3, 2], Vector3::new(0.0, 0.0, -1.0)),
        ([5, 1, 2, 6], Vector3::new(1.0, 0.0, 0.0)),
        ([0, 4, 7, 3], Vector3::new(-1.0, 0.0, 0.0)),
        ([7, 6, 2, 3], Vector3::new(0.0, 1.0, 0.0)),
        ([0, 1, 5, 4], Vector3::new(0.0, -1.0, 0.0)),
    ];

    for (corners, normal) in faces {
        let base = mesh.vertex_count();
        for corner in corners {
            mesh.add_vertex(Vertex::new(positions[corner], normal));
        }
        mesh.add_triangle(Triangle::new([base, base + 1, base + 2]));
        mesh.add_triangle(Triangle::new([base, base + 2, base + 3]));
    }

    mesh
}

fn generate_sphere_mesh(radius: f64, segments: u32) -> Mesh {
    let slices = segments as usize;
    let rings = ((segments as usize + 1) / 2).max(2);
    let mut mesh = Mesh::with_capacity(slices * (rings - 1) + 2, slices * rings * 2);

    let north = mesh.add_vertex(Vertex::new(
        Point3::new(0.0, 0.0, radius),
        Vector3::new(0.0, 0.0, 1.0),
    ));

    // Ring i sits at polar angle pi * i / rings, poles excluded
    for i in 1..rings {
        let phi = PI * i as f64 / rings as f64;
        let z = radius * phi.cos();
        let r = radius * phi.sin();
        for j in 0..slices {
            let theta = 2.0 * PI * j as f64 / slices as f64;
            let position = Point3::new(r * theta.cos(), r * theta.sin(), z);
            let normal = position.coords.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::z);
            mesh.add_vertex(Vertex::new(position, normal));
        }
    }

    let south = mesh.add_vertex(Vertex::new(
        Point3::new(0.0, 0.0, -radius),
        Vector3::new(0.0, 0.0, -1.0),
    ));

    let ring_start = |ring: usize| 1 + (ring - 1) * slices;

    for j in 0..slices {
        let next = (j + 1) % slices;
        mesh.add_triangle(Triangle::new([north, ring_start(1) + j, ring_start(1) + next]));
    }

    for ring in 1..rings - 1 {
        let upper = ring_start(ring);
        let lower = ring_start(ring + 1);
        for j in 0..slices {
            let next = (j + 1) % slices;
            mesh.add_triangle(Triangle::new([upper + j, lower + j, lower + next]));
            mesh.add_triangle(Triangle::new([upper + j, lower + next, upper + next]));
        }
    }

    let last = ring_start(rings - 1);
    for j in 0..slices {
        let next = (j + 1) % slices;
        mesh.add_triangle(Triangle::new([south, last + next, last + j]));
    }

    mesh
}

fn generate_cone_mesh(height: f64, r1: f64, r2: f64, segments: u32, center: bool) -> Mesh {
    let mut mesh = Mesh::new();
    let segments = segments as usize;

    // Cylinders run from z=0 to z=height unless centered
    let z0 = if center { -height / 2.0 } else { 0.0 };
    let z1 = z0 + height;

    let bottom_center = mesh.add_vertex(Vertex::new(
        Point3::new(0.0, 0.0, z0),
        Vector3::new(0.0, 0.0, -1.0),
    ));
    let top_center = mesh.add_vertex(Vertex::new(
        Point3::new(0.0, 0.0, z1),
        Vector3::new(0.0, 0.0, 1.0),
    ));

    let mut bottom = Vec::with_capacity(segments);
    let mut top = Vec::with_capacity(segments);

    for i in 0..segments {
        let angle = 2.0 * PI * i as f64 / segments as f64;
        let (sin, cos) = angle.sin_cos();
        bottom.push(mesh.add_vertex(Vertex::at(Point3::new(r1 * cos, r1 * sin, z0))));
        top.push(mesh.add_vertex(Vertex::at(Point3::new(r2 * cos, r2 * sin, z1))));
    }

    for i in 0..segments {
        let next = (i + 1) % segments;
        mesh.add_triangle(Triangle::new([bottom_center, bottom[next], bottom[i]]));
        mesh.add_triangle(Triangle::new([top_center, top[i], top[next]]));
        mesh.add_triangle(Triangle::new([bottom[i], bottom[next], top[i]]));
        mesh.add_triangle(Triangle::new([top[i], bottom[next], top[next]]));
    }

    mesh.recompute_normals();
    mesh
}
