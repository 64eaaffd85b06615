// SPDX-License-Identifier: GPL-3.0-only

//! Monocular depth model
//!
//! The ONNX model is a Depth Anything V2 style network: NCHW f32 input,
//! ImageNet-normalized RGB stretched to the model's input size, one relative
//! inverse depth map out.

use image::{RgbaImage, imageops};
use ndarray::Array4;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::constants::depth::{MODEL_FILENAME, NORMALIZE_MEAN, NORMALIZE_STD};
use crate::constants::app_info::APP_DIR;
use crate::errors::DepthError;

/// Relative inverse depth, row major, larger values are nearer
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

/// Anything that turns an upright RGBA image into a depth map
pub trait DepthModel: Send + Sync {
    fn infer(&self, image: &RgbaImage) -> Result<DepthMap, DepthError>;
}

/// Default model location under the user's data directory
pub fn default_model_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR).join("models").join(MODEL_FILENAME))
}

/// Stretch-resize and normalize an image into a 1x3xHxW tensor
pub fn preprocess(image: &RgbaImage, width: u32, height: u32) -> Array4<f32> {
    let resized = if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, imageops::FilterType::Triangle)
    };

    let mut input = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            input[[0, c, y as usize, x as usize]] = (v - NORMALIZE_MEAN[c]) / NORMALIZE_STD[c];
        }
    }
    input
}

/// Interpret a model output tensor as a depth map
///
/// Accepts `[H, W]`, `[1, H, W]` and `[1, 1, H, W]` shapes.
pub fn depth_map_from_output(dims: &[i64], data: &[f32]) -> Result<DepthMap, DepthError> {
    if dims.len() < 2 || dims[..dims.len() - 2].iter().any(|d| *d != 1) {
        return Err(DepthError::InvalidOutput(format!("unexpected shape {:?}", dims)));
    }
    let height = dims[dims.len() - 2];
    let width = dims[dims.len() - 1];
    if height <= 0 || width <= 0 || (height * width) as usize != data.len() {
        return Err(DepthError::InvalidOutput(format!(
            "shape {:?} does not match {} values",
            dims,
            data.len()
        )));
    }
    Ok(DepthMap {
        width: width as u32,
        height: height as u32,
        values: data.to_vec(),
    })
}

/// Depth model running on ONNX Runtime
pub struct OnnxDepthModel {
    session: Mutex<ort::session::Session>,
    input_width: u32,
    input_height: u32,
}

impl OnnxDepthModel {
    pub fn load(
        path: &Path,
        input_width: u32,
        input_height: u32,
        intra_threads: usize,
    ) -> Result<Self, DepthError> {
        if !path.is_file() {
            return Err(DepthError::ModelNotFound(path.to_path_buf()));
        }

        info!(path = %path.display(), "Loading depth model");
        let session = ort::session::Session::builder()
            .map_err(|e| DepthError::ModelLoad(format!("session builder: {}", e)))?
            .with_intra_threads(intra_threads)
            .map_err(|e| DepthError::ModelLoad(format!("thread setup: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| DepthError::ModelLoad(e.to_string()))?;

        info!(input_width, input_height, "Depth model loaded");
        Ok(Self {
            session: Mutex::new(session),
            input_width,
            input_height,
        })
    }
}

impl DepthModel for OnnxDepthModel {
    fn infer(&self, image: &RgbaImage) -> Result<DepthMap, DepthError> {
        let input = preprocess(image, self.input_width, self.input_height);
        let tensor = ort::value::Tensor::from_array(input)
            .map_err(|e| DepthError::Inference(format!("input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DepthError::Inference("session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| DepthError::Inference(e.to_string()))?;

        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| DepthError::InvalidOutput("model produced no output".to_string()))?;
        let (shape, data) = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| DepthError::InvalidOutput(e.to_string()))?;

        let dims: &[i64] = &shape;
        debug!(?dims, "Depth inference complete");
        depth_map_from_output(dims, data)
    }
}
