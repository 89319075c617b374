use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::{NUM_CELLS, SIZE};

/// The largest exponent that fits in one nibble of the packed representation
pub const MAX_PACKED_EXPONENT: u8 = 15;

/// The largest exponent a tile can reach, two tiles of this size do not merge
pub const MAX_EXPONENT: u8 = 31;

/// The largest tile value, `2^MAX_EXPONENT`
pub const MAX_TILE: u32 = 1 << MAX_EXPONENT;

/// A cell coordinate, `x` is the column (0 is leftmost) and `y` the row (0 is topmost)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// A 4x4 game board
///
/// Every cell is either empty or holds a power of two from 2 up to
/// [`MAX_TILE`], so every tile value fits in a `u32`.
/// Boards are small `Copy` values: every operation returns a new board
/// and never modifies the one it was called on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Board {
    // base-2 exponents stored row by row from the top, 0 marks an empty cell
    cells: [[u8; SIZE]; SIZE],
}

fn exponent_of(value: u32) -> Result<u8> {
    if value >= 2 && value <= MAX_TILE && value.is_power_of_two() {
        Ok(value.trailing_zeros() as u8)
    } else {
        Err(Error::InvalidBoard(format!(
            "tile value {} is not a power of two greater than 1",
            value
        )))
    }
}

impl Board {
    /// Creates a board with every cell empty
    pub const fn empty() -> Self {
        Self {
            cells: [[0; SIZE]; SIZE],
        }
    }

    /// Creates a board from rows of tile values, top row first
    pub fn from_rows(rows: [[Option<u32>; SIZE]; SIZE]) -> Result<Self> {
        let mut cells = [[0; SIZE]; SIZE];
        for (y, row) in rows.iter().enumerate() {
            for (x, value) in row.iter().enumerate() {
                if let Some(value) = value {
                    cells[y][x] = exponent_of(*value)?;
                }
            }
        }
        Ok(Self { cells })
    }

    /// Creates a board from a grid of unchecked dimensions, rejecting anything that is not 4x4
    pub fn from_grid<R: AsRef<[Option<u32>]>>(grid: &[R]) -> Result<Self> {
        if grid.len() != SIZE {
            return Err(Error::InvalidBoard(format!(
                "expected {} rows, found {}",
                SIZE,
                grid.len()
            )));
        }
        let mut rows = [[None; SIZE]; SIZE];
        for (y, row) in grid.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != SIZE {
                return Err(Error::InvalidBoard(format!(
                    "expected {} cells in row {}, found {}",
                    SIZE,
                    y,
                    row.len()
                )));
            }
            rows[y].copy_from_slice(row);
        }
        Self::from_rows(rows)
    }

    pub(crate) const fn from_exponents(cells: [[u8; SIZE]; SIZE]) -> Self {
        Self { cells }
    }

    pub(crate) fn exponents(&self) -> &[[u8; SIZE]; SIZE] {
        &self.cells
    }

    /// The base-2 exponent of the tile at `(x, y)`, 0 if the cell is empty
    pub fn exponent(&self, x: usize, y: usize) -> u8 {
        self.cells[y][x]
    }

    /// The tile value at `(x, y)`
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        match self.cells[y][x] {
            0 => None,
            exponent => Some(1 << exponent),
        }
    }

    pub fn get_at(&self, position: Position) -> Option<u32> {
        self.get(position.x, position.y)
    }

    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        self.cells[y][x] != 0
    }

    /// Returns a copy of this board with the tile `2^exponent` placed at `position`
    ///
    /// # Panics
    /// If `exponent` is above [`MAX_EXPONENT`].
    pub fn with_tile(&self, position: Position, exponent: u8) -> Self {
        assert!(exponent <= MAX_EXPONENT, "tile 2^{} is too large", exponent);
        let mut next = *self;
        next.cells[position.y][position.x] = exponent;
        next
    }

    /// Iterates over the empty cells, column by column
    pub fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..SIZE)
            .flat_map(|x| (0..SIZE).map(move |y| Position::new(x, y)))
            .filter(move |p| !self.is_occupied(p.x, p.y))
    }

    pub fn count_empty(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&exponent| exponent == 0)
            .count()
    }

    /// The largest tile on the board
    pub fn max_tile(&self) -> Option<u32> {
        match self.cells.iter().flatten().max() {
            Some(&exponent) if exponent > 0 => Some(1 << exponent),
            _ => None,
        }
    }

    /// The tile values row by row, top row first
    pub fn rows(&self) -> [[Option<u32>; SIZE]; SIZE] {
        let mut rows = [[None; SIZE]; SIZE];
        for y in 0..SIZE {
            for x in 0..SIZE {
                rows[y][x] = self.get(x, y);
            }
        }
        rows
    }

    /// Packs the board into 4 bits per cell, top-left cell in the highest nibble
    ///
    /// Returns `None` if any tile is larger than 32768.
    pub fn packed(&self) -> Option<u64> {
        let mut packed = 0u64;
        for &exponent in self.cells.iter().flatten() {
            if exponent > MAX_PACKED_EXPONENT {
                return None;
            }
            packed = (packed << 4) | exponent as u64;
        }
        Some(packed)
    }

    pub fn from_packed(mut packed: u64) -> Self {
        let mut cells = [[0; SIZE]; SIZE];
        for i in (0..NUM_CELLS).rev() {
            cells[i / SIZE][i % SIZE] = (packed & 0xf) as u8;
            packed >>= 4;
        }
        Self { cells }
    }

    /// Encodes the packed board as 8 big-endian bytes
    pub fn to_bytes(&self) -> Result<[u8; 8]> {
        let packed = self.packed().ok_or_else(|| {
            Error::InvalidBoard("tiles above 32768 cannot be encoded".to_string())
        })?;
        let mut bytes = [0; 8];
        (&mut bytes[..])
            .write_u64::<BigEndian>(packed)
            .map_err(|err| Error::InvalidBoard(err.to_string()))?;
        Ok(bytes)
    }

    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        let packed = bytes
            .read_u64::<BigEndian>()
            .map_err(|err| Error::InvalidBoard(format!("could not decode board: {}", err)))?;
        if !bytes.is_empty() {
            return Err(Error::InvalidBoard(format!(
                "{} trailing bytes after board",
                bytes.len()
            )));
        }
        Ok(Self::from_packed(packed))
    }
}

impl FromStr for Board {
    type Err = Error;

    /// Parses rows separated by `/` or newlines, cells separated by whitespace or commas.
    /// `.`, `-`, `_` and `0` mark empty cells.
    fn from_str(s: &str) -> Result<Self> {
        let grid = s
            .split(|c: char| c == '/' || c == '\n' || c == ';')
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .map(|row| {
                row.split(|c: char| c.is_whitespace() || c == ',' || c == '|')
                    .filter(|cell| !cell.is_empty())
                    .map(|cell| match cell {
                        "." | "-" | "_" | "0" => Ok(None),
                        _ => cell.parse::<u32>().map(Some).map_err(|_| {
                            Error::InvalidBoard(format!("could not parse '{}' as a tile", cell))
                        }),
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_grid(&grid)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..SIZE {
            for x in 0..SIZE {
                match self.get(x, y) {
                    Some(value) => write!(f, "{:>6}", value)?,
                    None => write!(f, "{:>6}", ".")?,
                }
                if x != SIZE - 1 {
                    write!(f, "|")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rows().iter()).finish()
    }
}
