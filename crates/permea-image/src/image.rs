use crate::error::ImageError;

/// Image size in pixels
///
/// A struct to represent the size of a dense field in pixels.
///
/// # Examples
///
/// ```
/// use permea_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl ImageSize {
    /// The size with width and height swapped.
    pub fn transposed(&self) -> Self {
        ImageSize {
            width: self.height,
            height: self.width,
        }
    }

    /// Number of pixels covered by this size.
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// Represents a dense field with pixel data.
///
/// The data is stored row-major with interleaved channels, i.e. the element
/// `(y, x, c)` lives at `(y * width + x) * CHANNELS + c`. Scalar maps use
/// `CHANNELS = 1`, flow fields `CHANNELS = 2` and color images `CHANNELS = 3`.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Create a new image from pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `data` - The pixel data of the image.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use permea_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 3>::new(
    ///    ImageSize {
    ///       width: 10,
    ///       height: 20,
    ///    },
    ///    vec![0u8; 10 * 20 * 3],
    /// ).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// assert_eq!(image.num_channels(), 3);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        let expected = size.width * size.height * CHANNELS;
        if data.len() != expected {
            return Err(ImageError::InvalidChannelShape(data.len(), expected));
        }

        Ok(Self { size, data })
    }

    /// Create a new image with the given size filled with `val`.
    ///
    /// # Examples
    ///
    /// ```
    /// use permea_image::{Image, ImageSize};
    ///
    /// let flow = Image::<f32, 2>::from_size_val(
    ///   ImageSize {
    ///     width: 4,
    ///     height: 3,
    ///   }, 0.0).unwrap();
    ///
    /// assert_eq!(flow.as_slice().len(), 4 * 3 * 2);
    /// ```
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let data = vec![val; size.width * size.height * CHANNELS];
        Image::new(size, data)
    }

    /// Create a new image filling every pixel with `f(x, y)`.
    pub fn from_fn(size: ImageSize, f: impl Fn(usize, usize) -> [T; CHANNELS]) -> Self {
        let mut data = Vec::with_capacity(size.width * size.height * CHANNELS);
        for y in 0..size.height {
            for x in 0..size.width {
                data.extend(f(x, y));
            }
        }
        Self { size, data }
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the number of columns of the image.
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Get the number of rows of the image.
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// Get the width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        CHANNELS
    }

    /// The raw pixel data in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The raw mutable pixel data in row-major order.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Get the channel values of the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// If the coordinates are out of bounds, an error is returned.
    pub fn pixel(&self, x: usize, y: usize) -> Result<&[T], ImageError> {
        if x >= self.width() || y >= self.height() {
            return Err(ImageError::PixelIndexOutOfBounds(
                x,
                y,
                self.width(),
                self.height(),
            ));
        }
        let base = (y * self.width() + x) * CHANNELS;
        Ok(&self.data[base..base + CHANNELS])
    }

    /// Overwrite the channel values of the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// If the coordinates are out of bounds, an error is returned.
    pub fn set_pixel(&mut self, x: usize, y: usize, value: [T; CHANNELS]) -> Result<(), ImageError> {
        if x >= self.width() || y >= self.height() {
            return Err(ImageError::PixelIndexOutOfBounds(
                x,
                y,
                self.width(),
                self.height(),
            ));
        }
        let base = (y * self.width() + x) * CHANNELS;
        for (dst, v) in self.data[base..base + CHANNELS].iter_mut().zip(value) {
            *dst = v;
        }
        Ok(())
    }

    /// Return the transposed image, i.e. `dst(x, y) = src(y, x)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use permea_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 1>::new(
    ///     ImageSize { width: 3, height: 2 },
    ///     vec![0, 1, 2, 3, 4, 5],
    /// ).unwrap();
    ///
    /// let t = image.transpose();
    /// assert_eq!(t.size(), ImageSize { width: 2, height: 3 });
    /// assert_eq!(t.as_slice(), &[0, 3, 1, 4, 2, 5]);
    /// ```
    pub fn transpose(&self) -> Self
    where
        T: Copy,
    {
        let (rows, cols) = (self.rows(), self.cols());
        let mut data = Vec::with_capacity(self.data.len());
        for x in 0..cols {
            for y in 0..rows {
                let base = (y * cols + x) * CHANNELS;
                data.extend_from_slice(&self.data[base..base + CHANNELS]);
            }
        }
        Self {
            size: self.size.transposed(),
            data,
        }
    }

    /// Cast the pixel data to a different type and scale it.
    ///
    /// Used to bring 8-bit guide images to the [0, 1] range expected by the filters.
    ///
    /// # Errors
    ///
    /// If a value cannot be represented in the target type, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use permea_image::{Image, ImageSize};
    ///
    /// let image_u8 = Image::<u8, 3>::new(
    ///     ImageSize { height: 2, width: 1 },
    ///     vec![0u8, 0, 255, 0, 0, 255],
    /// ).unwrap();
    ///
    /// let image_f32 = image_u8.cast_and_scale::<f32>(1. / 255.0).unwrap();
    ///
    /// assert_eq!(image_f32.pixel(0, 1).unwrap(), &[0.0, 0.0, 1.0]);
    /// ```
    pub fn cast_and_scale<U>(&self, scale: U) -> Result<Image<U, CHANNELS>, ImageError>
    where
        U: num_traits::NumCast + std::ops::Mul<Output = U> + Copy,
        T: num_traits::NumCast + Copy,
    {
        let casted_data = self
            .data
            .iter()
            .map(|&x| {
                let xu = U::from(x)
                    .ok_or(ImageError::CastError(std::any::type_name::<U>().to_string()))?;
                Ok(xu * scale)
            })
            .collect::<Result<Vec<U>, ImageError>>()?;

        Image::new(self.size, casted_data)
    }
}
