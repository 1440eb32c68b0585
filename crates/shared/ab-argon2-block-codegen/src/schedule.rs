//! Fixed permutation schedule of Argon2 block compression.
//!
//! A block is a 16x8 matrix of 64-bit lanes. Compression applies the permutation `P` to each of
//! the 8 column groups (16 consecutive lanes) and then to each of the 8 row groups (two adjacent
//! lanes taken from every 16-lane stride). `P` itself is 8 applications of the quarter-round `G`
//! over fixed lane positions within a group.


/// Number of 64-bit lanes in a block
pub const BLOCK_LANES: usize = 128;
/// Number of lanes mixed by a single application of `P`
pub const GROUP_LANES: usize = 16;
/// Number of `P` applications in each of the two passes (columns, then rows)
pub const GROUPS_PER_PASS: usize = BLOCK_LANES / GROUP_LANES;
/// Number of `G` applications inside `P`
pub const G_PER_GROUP: usize = 8;

/// Positions `(a, b, c, d)` within a group for each of the `G` applications of `P`, in order
pub const G_GROUPS: [[usize; 4]; G_PER_GROUP] = [
    [0, 4, 8, 12],
    [1, 5, 9, 13],
    [2, 6, 10, 14],
    [3, 7, 11, 15],
    [0, 5, 10, 15],
    [1, 6, 11, 12],
    [2, 7, 8, 13],
    [3, 4, 9, 14],
];

/// Right rotation amounts of the four `G` steps, in order
pub const G_ROTATIONS: [u32; 4] = [32, 24, 16, 63];

/// Lane indices of the column groups, group `k` covers lanes `16k..16k + 16`
pub const COLUMN_GROUPS: [[usize; GROUP_LANES]; GROUPS_PER_PASS] = column_groups();

/// Lane indices of the row groups, group `k` starts at lane `i = 2k` and covers
/// `i, i + 1, i + 16, i + 17, ..., i + 112, i + 113`
pub const ROW_GROUPS: [[usize; GROUP_LANES]; GROUPS_PER_PASS] = row_groups();

const fn column_groups() -> [[usize; GROUP_LANES]; GROUPS_PER_PASS] {
    let mut groups = [[0; GROUP_LANES]; GROUPS_PER_PASS];
    let mut group = 0;
    while group < GROUPS_PER_PASS {
        let mut position = 0;
        while position < GROUP_LANES {
            groups[group][position] = group * GROUP_LANES + position;
            position += 1;
        }
        group += 1;
    }
    groups
}

const fn row_groups() -> [[usize; GROUP_LANES]; GROUPS_PER_PASS] {
    let mut groups = [[0; GROUP_LANES]; GROUPS_PER_PASS];
    let mut group = 0;
    while group < GROUPS_PER_PASS {
        let mut position = 0;
        while position < GROUP_LANES {
            groups[group][position] = 2 * group + GROUP_LANES * (position / 2) + position % 2;
            position += 1;
        }
        group += 1;
    }
    groups
}

/// Pass of block compression that a permutation group belongs to
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Pass {
    /// Column groups, applied first
    Columns,
    /// Row groups, applied after all column groups
    Rows,
}

impl core::fmt::Display for Pass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Columns => "column",
            Self::Rows => "row",
        })
    }
}

/// Error returned by [`Schedule::validate()`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// `G` references a position outside of a group
    #[error("`G` application {application} references position {position} outside of a group")]
    GPositionOutOfRange {
        /// Index of `G` application within `P`
        application: usize,
        /// Offending position
        position: usize,
    },
    /// `G` arguments must be pairwise distinct
    #[error("`G` application {application} has repeated positions")]
    GPositionsNotDistinct {
        /// Index of `G` application within `P`
        application: usize,
    },
    /// Some position of a group is never mixed by `P`
    #[error("Position {position} of a group is never mixed by `P`")]
    GPositionUnmixed {
        /// Position that no `G` application references
        position: usize,
    },
    /// Rotation amount is not in `1..64`
    #[error("Rotation {rotation} is not in `1..64`")]
    InvalidRotation {
        /// Offending rotation amount
        rotation: u32,
    },
    /// Group references a lane outside of a block
    #[error("Lane {lane} of {pass} group {group} is outside of a block")]
    LaneOutOfRange {
        /// Pass of the group
        pass: Pass,
        /// Index of the group within the pass
        group: usize,
        /// Offending lane
        lane: usize,
    },
    /// Groups of a pass must cover every lane of a block exactly once
    #[error("Lane {lane} is covered more than once by {pass} groups")]
    LaneRepeated {
        /// Pass of the groups
        pass: Pass,
        /// Lane that was covered more than once
        lane: usize,
    },
}

/// Complete description of the lane access pattern of block compression
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Schedule {
    /// Positions within a group mixed by each `G` application of `P`
    pub g_groups: [[usize; 4]; G_PER_GROUP],
    /// Rotation amounts of the `G` steps
    pub g_rotations: [u32; 4],
    /// Groups of the column pass
    pub column_groups: [[usize; GROUP_LANES]; GROUPS_PER_PASS],
    /// Groups of the row pass
    pub row_groups: [[usize; GROUP_LANES]; GROUPS_PER_PASS],
}

impl Schedule {
    /// Schedule of Argon2 (RFC 9106) block compression
    pub const ARGON2: Self = Self {
        g_groups: G_GROUPS,
        g_rotations: G_ROTATIONS,
        column_groups: COLUMN_GROUPS,
        row_groups: ROW_GROUPS,
    };

    /// Groups in application order, column groups first
    pub fn permutation_groups(&self) -> impl Iterator<Item = &[usize; GROUP_LANES]> {
        self.column_groups.iter().chain(&self.row_groups)
    }

    /// Check structural invariants that kernels rely on
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let mut mixed = [false; GROUP_LANES];
        for (application, positions) in self.g_groups.iter().enumerate() {
            for (index, &position) in positions.iter().enumerate() {
                if position >= GROUP_LANES {
                    return Err(ScheduleError::GPositionOutOfRange {
                        application,
                        position,
                    });
                }
                if positions[..index].contains(&position) {
                    return Err(ScheduleError::GPositionsNotDistinct { application });
                }
                mixed[position] = true;
            }
        }
        if let Some(position) = mixed.iter().position(|&mixed| !mixed) {
            return Err(ScheduleError::GPositionUnmixed { position });
        }

        if let Some(&rotation) = self
            .g_rotations
            .iter()
            .find(|&&rotation| rotation == 0 || rotation >= 64)
        {
            return Err(ScheduleError::InvalidRotation { rotation });
        }

        for (pass, groups) in [
            (Pass::Columns, &self.column_groups),
            (Pass::Rows, &self.row_groups),
        ] {
            let mut covered = [false; BLOCK_LANES];
            for (group, lanes) in groups.iter().enumerate() {
                for &lane in lanes {
                    let Some(covered) = covered.get_mut(lane) else {
                        return Err(ScheduleError::LaneOutOfRange { pass, group, lane });
                    };
                    if *covered {
                        return Err(ScheduleError::LaneRepeated { pass, lane });
                    }
                    *covered = true;
                }
            }
        }

        Ok(())
    }
}
