use core::fmt::Write;

use heapless::String;

/// Room for `P5 ` + two 20-digit numbers + ` 255\n`.
pub const PGM_HEADER_CAPACITY: usize = 64;

pub const PGM_MAX_VALUE: u16 = 255;

/// Plain-text header of a binary (P5) graymap.
pub fn pgm_header(width: usize, height: usize) -> String<PGM_HEADER_CAPACITY> {
    let mut header = String::new();
    // Cannot overflow: the capacity covers the widest usize values.
    let _ = writeln!(header, "P5 {} {} {}", width, height, PGM_MAX_VALUE);
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qqvga_header() {
        let header = pgm_header(160, 120);
        assert_eq!(header.as_str(), "P5 160 120 255\n");
        assert_eq!(header.len(), 15);
    }

    #[test]
    fn test_header_fits_largest_dimensions() {
        let header = pgm_header(usize::MAX, usize::MAX);
        assert!(header.starts_with("P5 "));
        assert!(header.ends_with(" 255\n"));
    }
}
