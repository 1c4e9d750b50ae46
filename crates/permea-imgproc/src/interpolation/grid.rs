use permea_image::{Image, ImageError, ImageSize};

/// Create a meshgrid of x and y coordinates
///
/// # Arguments
///
/// * `size` - The size of the grid
///
/// # Returns
///
/// A tuple of maps of the given size holding the x and y coordinate of every pixel
pub fn meshgrid(size: ImageSize) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    displaced_grid(size, |_, _| [0.0, 0.0])
}

/// Create a grid of sample positions `(x + dx, y + dy)` with the offsets given by `f(x, y)`.
///
/// Used to build backward warping maps from a flow field.
pub fn displaced_grid(
    size: ImageSize,
    f: impl Fn(usize, usize) -> [f32; 2],
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    let mut map_x = Vec::with_capacity(size.num_pixels());
    let mut map_y = Vec::with_capacity(size.num_pixels());

    for y in 0..size.height {
        for x in 0..size.width {
            let [dx, dy] = f(x, y);
            map_x.push(x as f32 + dx);
            map_y.push(y as f32 + dy);
        }
    }

    Ok((Image::new(size, map_x)?, Image::new(size, map_y)?))
}
