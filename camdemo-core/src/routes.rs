use crate::camera::PixelFormat;

macro_rules! boundary_token {
    () => {
        "123456789000000000000987654321"
    };
}

pub const STREAM_BOUNDARY_TOKEN: &str = boundary_token!();

/// Content type of the multipart streams.
pub const STREAM_CONTENT_TYPE: &str =
    concat!("multipart/x-mixed-replace; boundary=", boundary_token!());

/// Delimiter written before the first part and after every part.
pub const STREAM_BOUNDARY: &str = concat!("--", boundary_token!());

pub const PGM_CONTENT_TYPE: &str = "image/x-portable-graymap";
pub const BMP_CONTENT_TYPE: &str = "image/bmp";
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Per-part content types inside the streams.
pub const BMP_PART_CONTENT_TYPE: &str = "image/bitmap";
pub const JPEG_PART_CONTENT_TYPE: &str = "image/jpg";

/// What a route serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RouteKind {
    Pgm,
    Bmp,
    BmpStream,
    Jpg,
    JpgStream,
}

impl RouteKind {
    pub fn path(&self) -> &'static str {
        match self {
            RouteKind::Pgm => "/pgm",
            RouteKind::Bmp => "/bmp",
            RouteKind::BmpStream => "/bmp_stream",
            RouteKind::Jpg => "/jpg",
            RouteKind::JpgStream => "/jpg_stream",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RouteKind::Pgm => PGM_CONTENT_TYPE,
            RouteKind::Bmp => BMP_CONTENT_TYPE,
            RouteKind::Jpg => JPEG_CONTENT_TYPE,
            RouteKind::BmpStream | RouteKind::JpgStream => STREAM_CONTENT_TYPE,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, RouteKind::BmpStream | RouteKind::JpgStream)
    }

    pub fn from_path(path: &str) -> Option<Self> {
        // Ignore any query string
        let path = path.split('?').next().unwrap_or(path);
        [
            RouteKind::Pgm,
            RouteKind::Bmp,
            RouteKind::BmpStream,
            RouteKind::Jpg,
            RouteKind::JpgStream,
        ]
        .into_iter()
        .find(|kind| kind.path() == path)
    }
}

/// A GET route registered for the configured sensor format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub kind: RouteKind,
    pub description: &'static str,
}

const GRAYSCALE_ROUTES: &[Route] = &[
    Route {
        kind: RouteKind::Bmp,
        description: "a single image/bmp gray image",
    },
    Route {
        kind: RouteKind::BmpStream,
        description: "multipart/x-mixed-replace stream of gray bitmaps",
    },
    Route {
        kind: RouteKind::Pgm,
        description: "a single image/x-portable-graymap image",
    },
];

const RGB565_ROUTES: &[Route] = &[
    Route {
        kind: RouteKind::Bmp,
        description: "single image/bitmap image",
    },
    Route {
        kind: RouteKind::BmpStream,
        description: "multipart/x-mixed-replace stream of bitmaps",
    },
];

const JPEG_ROUTES: &[Route] = &[
    Route {
        kind: RouteKind::Jpg,
        description: "single image/jpg image",
    },
    Route {
        kind: RouteKind::JpgStream,
        description: "multipart/x-mixed-replace stream of JPEGs",
    },
];

/// Routes served for a sensor configured with `format`.
pub fn routes_for(format: PixelFormat) -> &'static [Route] {
    match format {
        PixelFormat::Grayscale => GRAYSCALE_ROUTES,
        PixelFormat::Rgb565 => RGB565_ROUTES,
        PixelFormat::Jpeg => JPEG_ROUTES,
        PixelFormat::Other => &[],
    }
}
