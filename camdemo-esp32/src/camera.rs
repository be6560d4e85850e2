// Camera binding for the esp32-camera driver.
//
// Pins, pixel format and frame size come from cfg.toml. The defaults in
// cfg.toml.example match the XIAO ESP32S3 Sense (OV2640):
// - PWDN: -1 (not used, tied to 3V3)
// - RESET: -1 (not used)
// - XCLK: GPIO10
// - SIOD (SDA): GPIO40
// - SIOC (SCL): GPIO39
// - Y9..Y2 (D7..D0): GPIO48, 11, 12, 14, 16, 18, 17, 15
// - VSYNC: GPIO38
// - HREF: GPIO47
// - PCLK: GPIO13

// Camera driver implementation adapted from:
// https://github.com/Kezii/esp32cam_rs
// Copyright (c) Kezii
// Used under MIT license with attribution as required

use std::marker::PhantomData;

use anyhow::{bail, Result};
use camdemo_core::{Frame, PixelFormat};
use esp_idf_sys::{self as sys, camera, esp};
use log::{error, info, warn};

use crate::Config;

pub struct FrameBuffer<'a> {
    fb: *mut camera::camera_fb_t,
    _p: PhantomData<&'a camera::camera_fb_t>,
}

impl Frame for FrameBuffer<'_> {
    fn data(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts((*self.fb).buf, (*self.fb).len) }
    }

    fn width(&self) -> usize {
        unsafe { (*self.fb).width }
    }

    fn height(&self) -> usize {
        unsafe { (*self.fb).height }
    }

    fn format(&self) -> PixelFormat {
        to_pixel_format(unsafe { (*self.fb).format })
    }
}

impl Drop for FrameBuffer<'_> {
    fn drop(&mut self) {
        unsafe { camera::esp_camera_fb_return(self.fb) }
    }
}

fn to_pixel_format(format: camera::pixformat_t) -> PixelFormat {
    match format {
        camera::pixformat_t_PIXFORMAT_GRAYSCALE => PixelFormat::Grayscale,
        camera::pixformat_t_PIXFORMAT_RGB565 => PixelFormat::Rgb565,
        camera::pixformat_t_PIXFORMAT_JPEG => PixelFormat::Jpeg,
        _ => PixelFormat::Other,
    }
}

fn pixel_format_from_name(name: &str) -> Result<camera::pixformat_t> {
    Ok(match name {
        "grayscale" => camera::pixformat_t_PIXFORMAT_GRAYSCALE,
        "rgb565" => camera::pixformat_t_PIXFORMAT_RGB565,
        "jpeg" => camera::pixformat_t_PIXFORMAT_JPEG,
        other => bail!("unsupported pixel_format {:?} in cfg.toml", other),
    })
}

fn frame_size_from_name(name: &str) -> Result<camera::framesize_t> {
    Ok(match name {
        "qqvga" => camera::framesize_t_FRAMESIZE_QQVGA,
        "qvga" => camera::framesize_t_FRAMESIZE_QVGA,
        "cif" => camera::framesize_t_FRAMESIZE_CIF,
        "vga" => camera::framesize_t_FRAMESIZE_VGA,
        "svga" => camera::framesize_t_FRAMESIZE_SVGA,
        "xga" => camera::framesize_t_FRAMESIZE_XGA,
        "sxga" => camera::framesize_t_FRAMESIZE_SXGA,
        "uxga" => camera::framesize_t_FRAMESIZE_UXGA,
        other => bail!("unsupported frame_size {:?} in cfg.toml", other),
    })
}

/// Driver configuration built from cfg.toml.
fn driver_config(config: &Config) -> Result<camera::camera_config_t> {
    let pixel_format = pixel_format_from_name(config.pixel_format)?;
    let frame_size = frame_size_from_name(config.frame_size)?;

    if pixel_format != camera::pixformat_t_PIXFORMAT_JPEG && frame_size > camera::framesize_t_FRAMESIZE_QVGA {
        warn!("Frame sizes above QVGA are only reliable with JPEG output");
    }

    Ok(camera::camera_config_t {
        pin_pwdn: config.pin_pwdn,
        pin_xclk: config.pin_xclk,
        pin_reset: config.pin_reset,

        pin_d0: config.pin_d0,
        pin_d1: config.pin_d1,
        pin_d2: config.pin_d2,
        pin_d3: config.pin_d3,
        pin_d4: config.pin_d4,
        pin_d5: config.pin_d5,
        pin_d6: config.pin_d6,
        pin_d7: config.pin_d7,
        pin_vsync: config.pin_vsync,
        pin_href: config.pin_href,
        pin_pclk: config.pin_pclk,

        xclk_freq_hz: config.xclk_freq_hz,
        ledc_timer: sys::ledc_timer_t_LEDC_TIMER_0,
        ledc_channel: sys::ledc_channel_t_LEDC_CHANNEL_0,

        pixel_format,
        frame_size,

        jpeg_quality: config.jpeg_quality,
        fb_count: config.fb_count,
        grab_mode: camera::camera_grab_mode_t_CAMERA_GRAB_WHEN_EMPTY,

        fb_location: camera::camera_fb_location_t_CAMERA_FB_IN_PSRAM,

        __bindgen_anon_1: camera::camera_config_t__bindgen_ty_1 {
            pin_sccb_sda: config.pin_sda,
        },
        __bindgen_anon_2: camera::camera_config_t__bindgen_ty_2 {
            pin_sccb_scl: config.pin_scl,
        },

        ..Default::default()
    })
}

/// The initialized camera driver. Only one may exist at a time.
pub struct Camera {
    _p: PhantomData<*const ()>,
}

impl Camera {
    pub fn new(config: &Config) -> Result<Self> {
        let driver_config = driver_config(config)?;
        info!(
            "Initializing camera: {} {} at {} Hz",
            config.pixel_format, config.frame_size, config.xclk_freq_hz
        );

        esp!(unsafe { camera::esp_camera_init(&driver_config) })?;
        Ok(Self { _p: PhantomData })
    }
}

impl camdemo_core::Camera for Camera {
    type Frame<'a> = FrameBuffer<'a>;

    fn acquire(&self) -> Option<FrameBuffer<'_>> {
        let fb = unsafe { camera::esp_camera_fb_get() };
        if fb.is_null() {
            None
        } else {
            Some(FrameBuffer { fb, _p: PhantomData })
        }
    }

    fn sensor_format(&self) -> PixelFormat {
        let sensor = unsafe { camera::esp_camera_sensor_get() };
        if sensor.is_null() {
            return PixelFormat::Other;
        }
        to_pixel_format(unsafe { (*sensor).pixformat })
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(e) = esp!(unsafe { camera::esp_camera_deinit() }) {
            error!("esp_camera_deinit failed: {}", e);
        }
    }
}
