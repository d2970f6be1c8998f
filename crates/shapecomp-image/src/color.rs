use crate::{Image, ImageError};

/// Convert an RGB8 image to grayscale using the formula:
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// The result is rounded to the nearest integer.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use shapecomp_image::{Image, ImageSize};
/// use shapecomp_image::color::gray_from_rgb_u8;
///
/// let size = ImageSize { width: 1, height: 1 };
/// let rgb = Image::<u8, 3>::new(size, vec![255, 255, 255]).unwrap();
/// let mut gray = Image::<u8, 1>::from_size_val(size, 0).unwrap();
///
/// gray_from_rgb_u8(&rgb, &mut gray).unwrap();
/// assert_eq!(gray.as_slice(), &[255]);
/// ```
pub fn gray_from_rgb_u8(src: &Image<u8, 3>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    src.as_slice()
        .chunks_exact(3)
        .zip(dst.as_slice_mut().iter_mut())
        .for_each(|(src_pixel, dst_pixel)| {
            let r = src_pixel[0] as u32;
            let g = src_pixel[1] as u32;
            let b = src_pixel[2] as u32;
            // fixed point weights scaled by 2^14
            *dst_pixel = ((r * 4899 + g * 9617 + b * 1868 + (1 << 13)) >> 14) as u8;
        });

    Ok(())
}

/// Convert a grayscale image to an RGB image by replicating the value across all three channels.
///
/// Precondition: the input and output images must have the same size.
pub fn rgb_from_gray<T>(src: &Image<T, 1>, dst: &mut Image<T, 3>) -> Result<(), ImageError>
where
    T: Copy,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    src.iter()
        .zip(dst.as_slice_mut().chunks_exact_mut(3))
        .for_each(|(&v, dst_pixel)| {
            dst_pixel.copy_from_slice(&[v, v, v]);
        });

    Ok(())
}
