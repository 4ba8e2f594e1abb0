//! The mirrored region and the coordinate mapping between world and client.
//!
//! Clients see a cube of side `2 * radius` whose lowest corner sits at their
//! origin. [`Viewport::forward`] turns an absolute world coordinate into that
//! client space and [`Viewport::inverse`] undoes it exactly. Neither clamps:
//! coordinates outside the cube map like any other, and callers decide what
//! to do with them (see [`Viewport::contains_world`]).
//!
//! Arithmetic wraps on `i32` overflow so that `inverse(forward(p)) == p`
//! holds for every representable coordinate.

use crate::world::BlockPos;

/// Center, radius and vertical shift of the mirrored cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// World coordinate at the middle of the cube
    pub center: BlockPos,
    /// Half the side length of the cube
    pub radius: u16,
    /// Extra shift applied to client Y only
    pub y_offset: i32,
}

impl Viewport {
    pub const fn new(center: BlockPos, radius: u16, y_offset: i32) -> Self {
        Self {
            center,
            radius,
            y_offset,
        }
    }

    fn r(&self) -> i32 {
        i32::from(self.radius)
    }

    /// Number of cells in the cube, `(2 * radius)^3`.
    pub fn cell_count(&self) -> usize {
        let side = 2 * usize::from(self.radius);
        side * side * side
    }

    /// World-absolute to client-relative.
    pub fn forward(&self, world: BlockPos) -> BlockPos {
        let r = self.r();
        BlockPos {
            x: world.x.wrapping_sub(self.center.x).wrapping_add(r),
            y: world
                .y
                .wrapping_sub(self.center.y)
                .wrapping_add(r)
                .wrapping_add(self.y_offset),
            z: world.z.wrapping_sub(self.center.z).wrapping_add(r),
        }
    }

    /// Client-relative to world-absolute; the exact inverse of [`Self::forward`].
    pub fn inverse(&self, client: BlockPos) -> BlockPos {
        let r = self.r();
        BlockPos {
            x: client.x.wrapping_sub(r).wrapping_add(self.center.x),
            y: client
                .y
                .wrapping_sub(r)
                .wrapping_add(self.center.y)
                .wrapping_sub(self.y_offset),
            z: client.z.wrapping_sub(r).wrapping_add(self.center.z),
        }
    }

    /// Whether a world coordinate lies inside the mirrored cube
    /// `[center - radius, center + radius)` on every axis.
    pub fn contains_world(&self, world: BlockPos) -> bool {
        let r = i64::from(self.radius);
        let within = |value: i32, center: i32| {
            let delta = i64::from(value) - i64::from(center);
            (-r..r).contains(&delta)
        };
        within(world.x, self.center.x) && within(world.y, self.center.y) && within(world.z, self.center.z)
    }

    /// Every world cell of the cube, X outermost then Y then Z, ascending.
    pub fn world_cells(&self) -> impl Iterator<Item = BlockPos> {
        let r = self.r();
        let center = self.center;
        (-r..r).flat_map(move |i| {
            (-r..r).flat_map(move |j| {
                (-r..r).map(move |k| {
                    BlockPos::new(
                        center.x.wrapping_add(i),
                        center.y.wrapping_add(j),
                        center.z.wrapping_add(k),
                    )
                })
            })
        })
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(BlockPos::new(0, 75, 0), 16, 20)
    }
}
