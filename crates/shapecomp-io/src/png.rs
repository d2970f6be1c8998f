use std::{fs, fs::File, io::BufWriter, path::Path};

use png::{BitDepth, ColorType, Decoder, Encoder, Transformations};
use shapecomp_image::{
    color::{gray_from_rgb_u8, rgb_from_gray},
    Image, ImageSize,
};

use crate::error::IoError;

/// Read a PNG image as three channels (rgb8).
///
/// Grayscale images are replicated across the three channels, alpha is dropped,
/// palettes are expanded and 16-bit samples are reduced to 8 bits.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// A RGB image with three channels (rgb8).
pub fn read_image_png_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let (buf, size, color_type) = read_png_impl(file_path)?;

    let image = match color_type {
        ColorType::Rgb => Image::new(size, buf)?,
        ColorType::Rgba => Image::new(size, drop_alpha(&buf, 4))?,
        ColorType::Grayscale | ColorType::GrayscaleAlpha => {
            let gray = gray_channel(buf, size, color_type)?;
            let mut rgb = Image::from_size_val(size, 0u8)?;
            rgb_from_gray(&gray, &mut rgb)?;
            rgb
        }
        ColorType::Indexed => {
            return Err(IoError::PngDecodeError(
                "indexed color was not expanded".to_string(),
            ))
        }
    };

    Ok(image)
}

/// Read a PNG image with a single channel (mono8).
///
/// Color images are converted to grayscale with `Y = 0.299 R + 0.587 G + 0.114 B`.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// A grayscale image with a single channel (mono8).
pub fn read_image_png_mono8(file_path: impl AsRef<Path>) -> Result<Image<u8, 1>, IoError> {
    let (buf, size, color_type) = read_png_impl(file_path)?;

    let image = match color_type {
        ColorType::Grayscale | ColorType::GrayscaleAlpha => gray_channel(buf, size, color_type)?,
        ColorType::Rgb | ColorType::Rgba => {
            let rgb = match color_type {
                ColorType::Rgba => Image::<u8, 3>::new(size, drop_alpha(&buf, 4))?,
                _ => Image::<u8, 3>::new(size, buf)?,
            };
            let mut gray = Image::from_size_val(size, 0u8)?;
            gray_from_rgb_u8(&rgb, &mut gray)?;
            gray
        }
        ColorType::Indexed => {
            return Err(IoError::PngDecodeError(
                "indexed color was not expanded".to_string(),
            ))
        }
    };

    Ok(image)
}

/// Writes the given PNG _(rgb8)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The tensor containing the PNG image data.
pub fn write_image_png_rgb8(
    file_path: impl AsRef<Path>,
    image: &Image<u8, 3>,
) -> Result<(), IoError> {
    write_png_impl(
        file_path,
        image.as_slice(),
        image.size(),
        BitDepth::Eight,
        ColorType::Rgb,
    )
}

/// Writes the given PNG _(grayscale 8-bit)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The tensor containing the PNG image data.
pub fn write_image_png_gray8(
    file_path: impl AsRef<Path>,
    image: &Image<u8, 1>,
) -> Result<(), IoError> {
    write_png_impl(
        file_path,
        image.as_slice(),
        image.size(),
        BitDepth::Eight,
        ColorType::Grayscale,
    )
}

// utility function to read the png file, normalized to 8 bits per sample
fn read_png_impl(file_path: impl AsRef<Path>) -> Result<(Vec<u8>, ImageSize, ColorType), IoError> {
    // verify the file exists
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    // verify the file extension
    if let Some(extension) = file_path.extension() {
        if extension != "png" {
            return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
        }
    } else {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    let file = fs::File::open(file_path)?;
    let mut decoder = Decoder::new(file);
    decoder.set_transformations(Transformations::normalize_to_color8());

    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;
    buf.truncate(info.buffer_size());

    let size = ImageSize {
        width: info.width as usize,
        height: info.height as usize,
    };

    Ok((buf, size, info.color_type))
}

// keep the first `channels - 1` samples of every pixel
fn drop_alpha(buf: &[u8], channels: usize) -> Vec<u8> {
    buf.chunks_exact(channels)
        .flat_map(|pixel| pixel[..channels - 1].iter().copied())
        .collect()
}

fn gray_channel(
    buf: Vec<u8>,
    size: ImageSize,
    color_type: ColorType,
) -> Result<Image<u8, 1>, IoError> {
    let data = match color_type {
        ColorType::GrayscaleAlpha => drop_alpha(&buf, 2),
        _ => buf,
    };
    Ok(Image::new(size, data)?)
}

fn write_png_impl(
    file_path: impl AsRef<Path>,
    image_data: &[u8],
    image_size: ImageSize,
    // Make sure you set `depth` correctly
    depth: BitDepth,
    color_type: ColorType,
) -> Result<(), IoError> {
    let file = File::create(file_path)?;
    let writer = BufWriter::new(file);

    let mut encoder = Encoder::new(writer, image_size.width as u32, image_size.height as u32);
    encoder.set_color(color_type);
    encoder.set_depth(depth);

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    writer
        .write_image_data(image_data)
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoError;

    fn write_raw_png(
        path: &Path,
        data: &[u8],
        width: u32,
        height: u32,
        color_type: ColorType,
        depth: BitDepth,
    ) -> Result<(), IoError> {
        write_png_impl(
            path,
            data,
            ImageSize {
                width: width as usize,
                height: height as usize,
            },
            depth,
            color_type,
        )
    }

    #[test]
    fn read_write_png_rgb8() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("color.png");

        let image = Image::<u8, 3>::new(
            ImageSize {
                width: 2,
                height: 1,
            },
            vec![255, 0, 0, 0, 0, 255],
        )?;
        write_image_png_rgb8(&file_path, &image)?;

        let image_back = read_image_png_rgb8(&file_path)?;
        assert_eq!(image_back.size(), image.size());
        assert_eq!(image_back.as_slice(), image.as_slice());
        Ok(())
    }

    #[test]
    fn read_write_png_gray8() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("mask.png");

        let image = Image::<u8, 1>::new(
            ImageSize {
                width: 3,
                height: 2,
            },
            vec![0, 1, 1, 0, 255, 0],
        )?;
        write_image_png_gray8(&file_path, &image)?;

        let image_back = read_image_png_mono8(&file_path)?;
        assert_eq!(image_back.size().width, 3);
        assert_eq!(image_back.size().height, 2);
        assert_eq!(image_back.as_slice(), image.as_slice());
        Ok(())
    }

    #[test]
    fn read_gray_as_rgb8() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("gray.png");
        write_raw_png(&file_path, &[10, 20], 2, 1, ColorType::Grayscale, BitDepth::Eight)?;

        let image = read_image_png_rgb8(&file_path)?;
        assert_eq!(image.as_slice(), &[10, 10, 10, 20, 20, 20]);
        Ok(())
    }

    #[test]
    fn read_rgba_as_mono8() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("rgba.png");
        write_raw_png(
            &file_path,
            &[255, 255, 255, 0, 0, 0, 0, 255],
            2,
            1,
            ColorType::Rgba,
            BitDepth::Eight,
        )?;

        let image = read_image_png_mono8(&file_path)?;
        assert_eq!(image.as_slice(), &[255, 0]);
        Ok(())
    }

    #[test]
    fn read_gray16_as_mono8() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("gray16.png");
        // big endian samples: 0xff00 and 0x0100
        write_raw_png(
            &file_path,
            &[0xff, 0x00, 0x01, 0x00],
            2,
            1,
            ColorType::Grayscale,
            BitDepth::Sixteen,
        )?;

        let image = read_image_png_mono8(&file_path)?;
        assert_eq!(image.as_slice(), &[0xff, 0x01]);
        Ok(())
    }

    #[test]
    fn read_png_missing_file() {
        let result = read_image_png_rgb8("does/not/exist.png");
        assert!(matches!(result, Err(IoError::FileDoesNotExist(_))));
    }

    #[test]
    fn read_png_wrong_extension() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("color.jpg");
        std::fs::write(&file_path, b"not a png")?;
        let result = read_image_png_rgb8(&file_path);
        assert!(matches!(result, Err(IoError::InvalidFileExtension(_))));
        Ok(())
    }
}
