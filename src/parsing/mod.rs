//! MP4 box parsing modules.

pub mod box_header;
pub mod box_reader;
pub mod byte_reader;
pub mod chapter_list;
pub mod movie_header;

#[cfg(test)]
pub(crate) mod fixtures;

pub use box_header::{BoxHeader, BoxHeaderParser, BoxType};
pub use box_reader::{read_payload, BoxReader, ContainerBox};
pub use byte_reader::ByteReader;
pub use chapter_list::{chapter_durations_hns, ChapterListParser, RawChapterEntry, HNS_PER_MS};
pub use movie_header::{MovieHeaderParser, MovieTiming, HNS_PER_SECOND};
