use bending_geom::Aabb;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Integer block coordinates.
///
/// Ordered lexicographically (x, y, z) so maps keyed by position iterate
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block containing a world-space point.
    pub fn containing(point: DVec3) -> Self {
        Self {
            x: point.x.floor() as i32,
            y: point.y.floor() as i32,
            z: point.z.floor() as i32,
        }
    }

    /// The block `distance` steps away along `face`.
    pub fn relative(self, face: BlockFace, distance: i32) -> Self {
        let (dx, dy, dz) = face.offset();
        Self {
            x: self.x + dx * distance,
            y: self.y + dy * distance,
            z: self.z + dz * distance,
        }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// World-space center of the block.
    pub fn center(self) -> DVec3 {
        DVec3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z)) + DVec3::splat(0.5)
    }

    /// Full-cube bounds of this position.
    pub fn bounds(self) -> Aabb {
        Aabb::block(self.x, self.y, self.z)
    }

    pub fn distance_squared(self, other: BlockPos) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        let dz = i64::from(self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }
}

/// The six axis-aligned faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockFace {
    Up,
    Down,
    North,
    South,
    East,
    West,
}

impl BlockFace {
    pub const ALL: [BlockFace; 6] = [
        BlockFace::Up,
        BlockFace::Down,
        BlockFace::North,
        BlockFace::South,
        BlockFace::East,
        BlockFace::West,
    ];

    /// Unit step in block coordinates. North is -z, east is +x.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            BlockFace::Up => (0, 1, 0),
            BlockFace::Down => (0, -1, 0),
            BlockFace::North => (0, 0, -1),
            BlockFace::South => (0, 0, 1),
            BlockFace::East => (1, 0, 0),
            BlockFace::West => (-1, 0, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            BlockFace::Up => BlockFace::Down,
            BlockFace::Down => BlockFace::Up,
            BlockFace::North => BlockFace::South,
            BlockFace::South => BlockFace::North,
            BlockFace::East => BlockFace::West,
            BlockFace::West => BlockFace::East,
        }
    }

    pub fn direction(self) -> DVec3 {
        let (x, y, z) = self.offset();
        DVec3::new(f64::from(x), f64::from(y), f64::from(z))
    }
}

/// State of a single block position as far as the core cares.
///
/// Hosts map their own block data onto this set; anything the core has no
/// rules for is carried as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    #[default]
    Air,
    Water,
    Lava,
    Ice,
    Stone,
    Cobblestone,
    Dirt,
    Grass,
    Sand,
    Sandstone,
    Gravel,
    Plant,
    Bedrock,
    Other(u32),
}

impl BlockState {
    pub fn is_air(self) -> bool {
        self == BlockState::Air
    }

    pub fn is_water(self) -> bool {
        self == BlockState::Water
    }

    pub fn is_lava(self) -> bool {
        self == BlockState::Lava
    }

    /// Blocks entities and abilities can pass through.
    pub fn is_transparent(self) -> bool {
        matches!(self, BlockState::Air | BlockState::Plant)
    }

    pub fn is_transparent_or_water(self) -> bool {
        self.is_transparent() || self.is_water()
    }

    /// Whether the block contributes a collision volume.
    pub fn is_solid(self) -> bool {
        !matches!(
            self,
            BlockState::Air | BlockState::Plant | BlockState::Water | BlockState::Lava
        )
    }

    /// Blocks earthbending abilities may move.
    pub fn is_earth(self) -> bool {
        matches!(
            self,
            BlockState::Stone
                | BlockState::Cobblestone
                | BlockState::Dirt
                | BlockState::Grass
                | BlockState::Sand
                | BlockState::Sandstone
                | BlockState::Gravel
        )
    }

    pub fn is_unbreakable(self) -> bool {
        self == BlockState::Bedrock
    }

    /// Solid replacement for loose blocks that would otherwise fall.
    pub fn solid_type(self) -> Self {
        match self {
            BlockState::Sand => BlockState::Sandstone,
            BlockState::Gravel => BlockState::Stone,
            other => other,
        }
    }

    /// Collision bounds of this state at `pos`; non-solid blocks yield a
    /// degenerate box that never intersects.
    pub fn bounds_at(self, pos: BlockPos) -> Aabb {
        if self.is_solid() { pos.bounds() } else { Aabb::DUMMY }
    }
}
