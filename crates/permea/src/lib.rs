#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use permea_image as image;

#[doc(inline)]
pub use permea_imgproc as imgproc;

#[doc(inline)]
pub use permea_filter as filter;
