use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat, Point, Size, Vector, BORDER_CONSTANT},
    imgproc,
    prelude::*,
};

use crate::{
    config::{ColorBand, FloaterConfig},
    filter::ShapeFilter,
    traits::Detector,
    types::{DetectionBox, Region},
};

/// Finds compact blobs of a target colour (floats, buoys, markers).
pub struct FloaterDetector {
    bands: Vec<ColorBand>,
    blur_kernel: i32,
    erode_iterations: i32,
    dilate_iterations: i32,
    shape_filter: ShapeFilter,
}

impl FloaterDetector {
    pub fn new(config: &FloaterConfig) -> Self {
        FloaterDetector {
            bands: config.bands.clone(),
            blur_kernel: config.blur_kernel,
            erode_iterations: config.erode_iterations,
            dilate_iterations: config.dilate_iterations,
            shape_filter: ShapeFilter::from_config(config),
        }
    }

    fn to_hsv(&self, image: &Mat) -> Result<Mat> {
        let mut blurred = Mat::default();
        imgproc::gaussian_blur_def(
            image,
            &mut blurred,
            Size::new(self.blur_kernel, self.blur_kernel),
            0.,
        )?;

        let mut hsv_image = Mat::default();
        imgproc::cvt_color_def(&blurred, &mut hsv_image, imgproc::COLOR_BGR2HSV)?;

        Ok(hsv_image)
    }

    fn threshold_image(&self, hsv_image: &Mat, band: &ColorBand) -> Result<Mat> {
        let lower = Mat::from_slice(band.lower.as_slice())?.try_clone()?;
        let upper = Mat::from_slice(band.upper.as_slice())?.try_clone()?;

        let mut thresholded_image = Mat::default();
        core::in_range(hsv_image, &lower, &upper, &mut thresholded_image)?;

        Ok(thresholded_image)
    }

    fn clean_mask(&self, mask: &Mat) -> Result<Mat> {
        let kernel = Mat::default();
        let anchor = Point::new(-1, -1);
        let border_value = imgproc::morphology_default_border_value()?;

        let mut eroded = Mat::default();
        imgproc::erode(
            mask,
            &mut eroded,
            &kernel,
            anchor,
            self.erode_iterations,
            BORDER_CONSTANT,
            border_value,
        )?;

        let mut dilated = Mat::default();
        imgproc::dilate(
            &eroded,
            &mut dilated,
            &kernel,
            anchor,
            self.dilate_iterations,
            BORDER_CONSTANT,
            border_value,
        )?;

        Ok(dilated)
    }

    fn find_regions(&self, mask: &Mat) -> Result<Vec<Region>> {
        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            mask,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )?;

        contours
            .iter()
            .map(|contour| -> Result<Region> {
                let area = imgproc::contour_area(&contour, false)?;
                let rect = imgproc::bounding_rect(&contour)?;

                Ok(Region {
                    area,
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                })
            })
            .collect()
    }

    fn extract_band(&self, hsv_image: &Mat, band: &ColorBand) -> Result<Vec<DetectionBox>> {
        let mask = self.threshold_image(hsv_image, band)?;
        let mask = self.clean_mask(&mask)?;
        let regions = self.find_regions(&mask)?;

        Ok(regions_to_boxes(&regions, &self.shape_filter, band))
    }
}

impl Detector for FloaterDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<DetectionBox>> {
        let hsv_image = self.to_hsv(frame).context("Colour conversion failed")?;

        let mut boxes = Vec::new();
        for band in &self.bands {
            let found = self
                .extract_band(&hsv_image, band)
                .with_context(|| format!("Blob extraction failed for band {:?}", band.label))?;
            boxes.extend(found);
        }

        Ok(boxes)
    }
}

pub fn regions_to_boxes(
    regions: &[Region],
    shape_filter: &ShapeFilter,
    band: &ColorBand,
) -> Vec<DetectionBox> {
    regions
        .iter()
        .filter(|region| shape_filter.accepts(region))
        .map(|region| DetectionBox {
            x0: region.x,
            y0: region.y,
            x1: region.x + region.width,
            y1: region.y + region.height,
            label: band.label.clone(),
            color: band.color,
        })
        .collect()
}
