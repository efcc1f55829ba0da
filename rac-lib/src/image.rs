//! Decoding of CCD image data.
use ndarray::Array2;

use crate::aez::{CcdImage, JPEGQ_UNCOMPRESSED_16BIT};
use crate::{Error, Result};

/// Turns the still encoded image bytes of a [CcdImage] into pixels, rows by columns.
pub trait ImageDecoder: Send + Sync {
    /// # Errors
    /// If the image cannot be decoded by this decoder.
    fn decode(&self, img: &CcdImage) -> Result<Array2<u16>>;
}

/// Decoder for uncompressed images of 16 bit little-endian pixels.
///
/// JPEG compressed images are reported as [Error::UnsupportedImage].
#[derive(Debug, Clone, Copy, Default)]
pub struct RawImageDecoder;

impl ImageDecoder for RawImageDecoder {
    fn decode(&self, img: &CcdImage) -> Result<Array2<u16>> {
        let pack = &img.pack_data;
        if pack.jpegq != JPEGQ_UNCOMPRESSED_16BIT {
            return Err(Error::UnsupportedImage(format!(
                "JPEG compressed image (JPEGQ {})",
                pack.jpegq
            )));
        }

        let rows = usize::from(pack.nrow);
        let columns = pack.columns();
        let expected = rows * columns * 2;
        if img.image.len() != expected {
            return Err(Error::ImageSize {
                actual: img.image.len(),
                expected,
                rows,
                columns,
            });
        }

        let pixels: Vec<u16> = img
            .image
            .chunks_exact(2)
            .map(|p| u16::from_le_bytes([p[0], p[1]]))
            .collect();
        Array2::from_shape_vec((rows, columns), pixels).map_err(|_| Error::ImageSize {
            actual: img.image.len(),
            expected,
            rows,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aez::CcdImagePackData;

    fn image(jpegq: u8, nrow: u16, ncol: u16, dat: &[u8]) -> CcdImage {
        CcdImage {
            pack_data: CcdImagePackData {
                jpegq,
                nrow,
                ncol,
                ..Default::default()
            },
            bad_columns: Vec::default(),
            image: dat.to_vec(),
        }
    }

    #[test]
    fn decode_raw() {
        #[rustfmt::skip]
        let dat = [
            0x01, 0x00, 0x02, 0x00, 0x03, 0x00,
            0x04, 0x00, 0x05, 0x00, 0xff, 0xff,
        ];
        let pixels = RawImageDecoder.decode(&image(101, 2, 2, &dat)).unwrap();

        assert_eq!(pixels.dim(), (2, 3));
        assert_eq!(pixels[[0, 0]], 1);
        assert_eq!(pixels[[0, 2]], 3);
        assert_eq!(pixels[[1, 0]], 4);
        assert_eq!(pixels[[1, 2]], 0xffff);
    }

    #[test]
    fn decode_wrong_size() {
        let err = RawImageDecoder
            .decode(&image(101, 2, 2, &[0u8; 10]))
            .unwrap_err();
        assert!(
            matches!(
                err,
                Error::ImageSize {
                    actual: 10,
                    expected: 12,
                    rows: 2,
                    columns: 3
                }
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn jpeg_unsupported() {
        let err = RawImageDecoder.decode(&image(90, 1, 0, &[0u8; 2])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedImage(_)));
    }
}
