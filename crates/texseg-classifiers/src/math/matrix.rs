use std::error::Error;
use std::fmt;

/// Row-major 2D buffer. Rows are samples, columns are feature components.
#[derive(Clone, Debug, PartialEq)]
pub struct Array2<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Array2<T> {
    pub fn from_shape_vec(shape: (usize, usize), data: Vec<T>) -> Result<Self, ShapeError> {
        let (rows, cols) = shape;
        ShapeError::check(rows, cols, data.len())?;
        Ok(Self { data, rows, cols })
    }

    /// An empty matrix with a known column count, ready for `push_row`.
    pub fn with_capacity(rows: usize, cols: usize) -> Self {
        Self {
            data: Vec::with_capacity(rows * cols),
            rows: 0,
            cols,
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn row_slice(&self, row: usize) -> &[T] {
        let start = self.offset(row, 0);
        &self.data[start..start + self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.rows).map(move |row| self.row_slice(row))
    }

    /// Appends one row. Panics if `row.len() != ncols()`.
    pub fn push_row(&mut self, row: &[T])
    where
        T: Clone,
    {
        assert_eq!(row.len(), self.cols, "row length must match column count");
        self.data.extend_from_slice(row);
        self.rows += 1;
    }
}

#[derive(Debug, Clone)]
pub struct ShapeError {
    rows: usize,
    cols: usize,
    len: usize,
}

impl ShapeError {
    /// Checks that a buffer of `len` values holds `rows` x `cols`.
    pub fn check(rows: usize, cols: usize, len: usize) -> Result<(), ShapeError> {
        if rows * cols == len {
            Ok(())
        } else {
            Err(ShapeError { rows, cols, len })
        }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid shape ({}, {}) for buffer of length {}",
            self.rows, self.cols, self.len
        )
    }
}

impl Error for ShapeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_shape_vec_rejects_bad_length() {
        assert!(Array2::from_shape_vec((2, 3), vec![0.0f32; 5]).is_err());
        assert!(Array2::from_shape_vec((2, 3), vec![0.0f32; 6]).is_ok());
    }

    #[test]
    fn push_row_grows_rows() {
        let mut m = Array2::with_capacity(2, 2);
        m.push_row(&[1.0f32, 2.0]);
        m.push_row(&[3.0, 4.0]);
        assert_eq!((m.nrows(), m.ncols()), (2, 2));
        assert_eq!(m.row_slice(1), &[3.0, 4.0]);
        assert_eq!(m.rows().next(), Some(&[1.0f32, 2.0][..]));
    }
}
