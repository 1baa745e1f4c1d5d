//! Synthetic frames for unit tests.

use opencv::{
    core::{Mat, Rect, Scalar, Vector, CV_8UC3},
    imgcodecs, imgproc,
    prelude::*,
};

pub fn solid_frame(rows: i32, cols: i32, bgr: (f64, f64, f64)) -> Mat {
    Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::new(bgr.0, bgr.1, bgr.2, 0.))
        .unwrap()
}

pub fn fill_rect(frame: &mut Mat, rect: Rect, bgr: (f64, f64, f64)) {
    imgproc::rectangle(
        frame,
        rect,
        Scalar::new(bgr.0, bgr.1, bgr.2, 0.),
        imgproc::FILLED,
        imgproc::LINE_8,
        0,
    )
    .unwrap();
}

pub fn encode_jpeg(frame: &Mat) -> Vec<u8> {
    let mut buf = Vector::<u8>::new();
    imgcodecs::imencode(".jpg", frame, &mut buf, &Vector::new()).unwrap();
    buf.to_vec()
}
