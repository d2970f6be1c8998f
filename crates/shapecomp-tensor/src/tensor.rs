use thiserror::Error;

/// An error type for tensor operations.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// Tensor shape does not match the provided data.
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },
}

/// Compute the strides from the shape of a tensor.
///
/// # Arguments
///
/// * `shape` - The shape of the tensor.
///
/// # Returns
///
/// The row-major (C-contiguous) strides of the tensor.
pub fn get_strides_from_shape<const N: usize>(shape: [usize; N]) -> [usize; N] {
    let mut strides: [usize; N] = [0; N];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// A multi-dimensional array with owned, contiguous data.
///
/// The data is always stored in row-major order: the rightmost dimension varies
/// fastest in memory, and `strides` describes how many elements to skip when moving
/// along each dimension.
///
/// # Examples
///
/// ```rust
/// use shapecomp_tensor::Tensor2;
///
/// let data: Vec<u8> = vec![1, 2, 3, 4];
/// let t = Tensor2::<u8>::from_shape_vec([2, 2], data).unwrap();
/// assert_eq!(t.shape, [2, 2]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T, const N: usize> {
    storage: Vec<T>,
    /// The shape of the tensor.
    pub shape: [usize; N],
    /// The strides of the tensor data in memory.
    pub strides: [usize; N],
}

impl<T, const N: usize> Tensor<T, N> {
    /// Creates a new `Tensor` with the given shape and data.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape of the tensor, an error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use shapecomp_tensor::Tensor2;
    ///
    /// let t = Tensor2::<f32>::from_shape_vec([2, 3], vec![0.0; 6]).unwrap();
    /// assert_eq!(t.numel(), 6);
    /// ```
    pub fn from_shape_vec(shape: [usize; N], data: Vec<T>) -> Result<Self, TensorError> {
        let numel = shape.iter().product::<usize>();
        if numel != data.len() {
            return Err(TensorError::InvalidShape {
                expected: numel,
                actual: data.len(),
            });
        }
        let strides = get_strides_from_shape(shape);
        Ok(Self {
            storage: data,
            shape,
            strides,
        })
    }

    /// Get the data of the tensor as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.storage
    }

    /// Get the data of the tensor as a mutable slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.storage
    }

    /// Returns the number of elements in the tensor.
    #[inline]
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Returns true if the tensor holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Iterate over the elements of the tensor in memory order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.storage.iter()
    }

    /// Get the memory offset of an element, or `None` if the index is out of bounds.
    pub fn get_iter_offset(&self, index: [usize; N]) -> Option<usize> {
        let mut offset = 0;
        for ((&idx, &dim_size), &stride) in index
            .iter()
            .zip(self.shape.iter())
            .zip(self.strides.iter())
        {
            if idx >= dim_size {
                return None;
            }
            offset += idx * stride;
        }
        Some(offset)
    }

    /// Get the element at the given index.
    ///
    /// # Example
    ///
    /// ```
    /// use shapecomp_tensor::Tensor2;
    ///
    /// let t = Tensor2::<u8>::from_shape_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
    ///
    /// assert_eq!(t.get([0, 1]), Some(&2));
    /// assert_eq!(t.get([1, 0]), Some(&3));
    /// assert!(t.get([2, 0]).is_none());
    /// ```
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        self.get_iter_offset(index).and_then(|i| self.storage.get(i))
    }
}

impl<T> Tensor<T, 2> {
    /// Iterate over the rows of the tensor.
    pub fn rows(&self) -> std::slice::Chunks<'_, T> {
        // NOTE: chunks panics on a zero width
        self.storage.chunks(self.shape[1].max(1))
    }
}
