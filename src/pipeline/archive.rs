use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::ArchiveError;
use crate::pipeline::encode::EncodedFrame;

/// Bundle the gallery into a single zip blob, one entry per frame named
/// `photo-<n>.<ext>` in capture order (1-based). Read-only with respect to
/// the gallery and repeatable in any phase.
pub fn package_frames(frames: &[EncodedFrame]) -> Result<Vec<u8>, ArchiveError> {
    if frames.is_empty() {
        return Err(ArchiveError::Empty);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (index, frame) in frames.iter().enumerate() {
        let name = format!("photo-{}.{}", index + 1, frame.format().extension());
        writer.start_file(name, options)?;
        writer.write_all(frame.bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::StillFormat;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn empty_gallery_is_rejected() {
        assert!(matches!(package_frames(&[]), Err(ArchiveError::Empty)));
    }

    #[test]
    fn entries_are_named_in_capture_order_and_round_trip() {
        let frames = vec![
            EncodedFrame::new(vec![1, 1, 1], StillFormat::Jpeg, "a"),
            EncodedFrame::new(vec![2, 2], StillFormat::Png, "b"),
            EncodedFrame::new(vec![3], StillFormat::Jpeg, "c"),
        ];

        let blob = package_frames(&frames).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(blob)).unwrap();
        assert_eq!(archive.len(), 3);

        let expected = ["photo-1.jpg", "photo-2.png", "photo-3.jpg"];
        for (i, name) in expected.iter().enumerate() {
            let mut entry = archive.by_name(name).unwrap();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).unwrap();
            assert_eq!(bytes, frames[i].bytes());
        }
    }

    #[test]
    fn export_is_repeatable() {
        let frames = vec![EncodedFrame::new(vec![7; 16], StillFormat::Jpeg, "x")];
        let first = package_frames(&frames).unwrap();
        let second = package_frames(&frames).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(second)).unwrap();
        assert_eq!(archive.len(), 1);
        assert!(archive.by_name("photo-1.jpg").is_ok());
        assert!(!first.is_empty());
    }
}
