//! Image orientation and resampling for `[H, W, C]` tensors, backed by the
//! `image` crate.
//!
//! Bilinear resampling of `f32` images clamps to `[0, 1]`, so float images
//! are expected to be normalized already.

use ::image::imageops::{self, FilterType};
use ::image::{ImageBuffer, Luma, LumaA, Pixel, Primitive, Rgb, Rgba};

use crate::schema::ResizeMethod;
use crate::tensor::{Tensor, TensorData};

/// Channel counts that map onto an `image` pixel type.
pub(crate) const SUPPORTED_CHANNELS: std::ops::RangeInclusive<usize> = 1..=4;

impl From<ResizeMethod> for FilterType {
    fn from(method: ResizeMethod) -> Self {
        match method {
            ResizeMethod::Nearest => FilterType::Nearest,
            ResizeMethod::Bilinear => FilterType::Triangle,
        }
    }
}

/// Optionally flips `src` top to bottom, then resizes it to
/// `[height, width, C]`. The caller guarantees rank 3; the dtype of `src` is
/// preserved.
pub(crate) fn transform(
    src: &Tensor,
    height: usize,
    width: usize,
    method: ResizeMethod,
    flip_vertical: bool,
) -> Result<Tensor, String> {
    let (in_h, in_w, channels) = (src.shape[0], src.shape[1], src.shape[2]);
    if !flip_vertical && (in_h, in_w) == (height, width) {
        return Ok(src.clone());
    }

    let source = (dim(in_w)?, dim(in_h)?);
    let target = (dim(width)?, dim(height)?);
    let filter = FilterType::from(method);
    let data = match &src.data {
        TensorData::U8(v) => {
            TensorData::U8(by_channels(channels, v.clone(), source, target, filter, flip_vertical)?)
        }
        TensorData::F32(v) => {
            TensorData::F32(by_channels(channels, v.clone(), source, target, filter, flip_vertical)?)
        }
    };
    Ok(Tensor {
        shape: vec![height, width, channels],
        data,
    })
}

fn dim(len: usize) -> Result<u32, String> {
    u32::try_from(len).map_err(|_| format!("image dimension {len} is too large"))
}

fn by_channels<S>(
    channels: usize,
    raw: Vec<S>,
    source: (u32, u32),
    target: (u32, u32),
    filter: FilterType,
    flip: bool,
) -> Result<Vec<S>, String>
where
    S: Primitive + 'static,
    Luma<S>: Pixel<Subpixel = S>,
    LumaA<S>: Pixel<Subpixel = S>,
    Rgb<S>: Pixel<Subpixel = S>,
    Rgba<S>: Pixel<Subpixel = S>,
{
    match channels {
        1 => resample::<Luma<S>>(raw, source, target, filter, flip),
        2 => resample::<LumaA<S>>(raw, source, target, filter, flip),
        3 => resample::<Rgb<S>>(raw, source, target, filter, flip),
        4 => resample::<Rgba<S>>(raw, source, target, filter, flip),
        c => Err(format!("unsupported channel count {c}")),
    }
}

fn resample<P>(
    raw: Vec<P::Subpixel>,
    (in_w, in_h): (u32, u32),
    (out_w, out_h): (u32, u32),
    filter: FilterType,
    flip: bool,
) -> Result<Vec<P::Subpixel>, String>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let mut img = ImageBuffer::<P, Vec<P::Subpixel>>::from_raw(in_w, in_h, raw)
        .ok_or_else(|| format!("pixel buffer does not hold a {in_w}x{in_h} image"))?;
    if flip {
        imageops::flip_vertical_in_place(&mut img);
    }
    if img.dimensions() != (out_w, out_h) {
        img = imageops::resize(&img, out_w, out_h, filter);
    }
    Ok(img.into_raw())
}
