//! Package Query Handler - 已合成书籍的可下载归档
//!
//! 归档为 POSIX tar，成员顺序固定：
//!
//! ```text
//! manifest.json
//! toc.json
//! voice-map.json
//! segments/{segmentID}.json   （存储顺序）
//! audio/{segmentID}.{format}  （存储顺序）
//! ```
//!
//! 所有 header 的 mtime / uid / gid 为 0，mode 为 0644，
//! 相同记录两次打包得到逐字节相同的归档。

use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, StoragePort};
use crate::application::queries::PackageBook;
use crate::domain::book::{Book, Chapter, Segment};

pub const PACKAGE_CONTENT_TYPE: &str = "application/x-tar";
const MANIFEST_VERSION: u32 = 1;

/// 清单
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub version: u32,
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub language: String,
    pub orig_format: String,
    pub total_chapters: usize,
    pub total_segments: usize,
    /// 各片段最后一个时间戳 end 之和（秒）
    pub total_duration: f64,
}

impl Manifest {
    pub fn new(book: &Book, segments: &[Segment]) -> Self {
        Self {
            version: MANIFEST_VERSION,
            book_id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            language: book.language.clone(),
            orig_format: book.orig_format.clone(),
            total_chapters: book.total_chapters,
            total_segments: segments.len(),
            total_duration: segments.iter().map(Segment::duration).sum(),
        }
    }
}

/// 目录项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocEntry {
    pub chapter_id: String,
    pub number: usize,
    pub title: String,
    pub toc_path: Vec<String>,
    pub paragraph_count: usize,
}

impl From<&Chapter> for TocEntry {
    fn from(chapter: &Chapter) -> Self {
        Self {
            chapter_id: chapter.id.clone(),
            number: chapter.number,
            title: chapter.title.clone(),
            toc_path: chapter.toc_path.clone(),
            paragraph_count: chapter.paragraph_count(),
        }
    }
}

/// 打包结果
#[derive(Debug, Clone)]
pub struct PackageArchive {
    pub file_name: String,
    pub manifest: Manifest,
    pub bytes: Vec<u8>,
}

impl PackageArchive {
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }
}

/// PackageBook Handler
pub struct PackageBookHandler {
    repo: Arc<dyn BookRepositoryPort>,
    storage: Arc<dyn StoragePort>,
}

impl PackageBookHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>, storage: Arc<dyn StoragePort>) -> Self {
        Self { repo, storage }
    }

    pub async fn handle(&self, query: PackageBook) -> Result<PackageArchive, ApplicationError> {
        let book = self.repo.get_book(&query.book_id).await?;
        if !book.is_synthesized() {
            return Err(ApplicationError::invalid_state(format!(
                "book {} is not synthesized (status: {})",
                book.id, book.status
            )));
        }

        let mut chapters = self.repo.list_chapters(&book.id).await?;
        chapters.sort_by_key(|c| c.number);
        let segments = self.repo.list_segments(&book.id).await?;
        let voice_map = self.repo.get_voice_map(&book.id).await?;

        let manifest = Manifest::new(&book, &segments);
        let toc: Vec<TocEntry> = chapters.iter().map(TocEntry::from).collect();

        let mut builder = tar::Builder::new(Vec::new());
        append(&mut builder, "manifest.json", &to_json(&manifest)?)?;
        append(&mut builder, "toc.json", &to_json(&toc)?)?;
        append(&mut builder, "voice-map.json", &to_json(&voice_map)?)?;
        for segment in &segments {
            append(
                &mut builder,
                &format!("segments/{}.json", segment.id),
                &to_json(segment)?,
            )?;
        }
        for segment in &segments {
            let path = segment.audio_path.as_deref().ok_or_else(|| {
                ApplicationError::invalid_state(format!("segment {} has no audio", segment.id))
            })?;
            let format = path.rsplit('.').next().unwrap_or("bin");
            let audio = self.storage.get(path).await?;
            append(
                &mut builder,
                &format!("audio/{}.{}", segment.id, format),
                &audio,
            )?;
        }
        let bytes = builder.into_inner().map_err(archive_error)?;

        tracing::info!(
            book_id = %book.id,
            segments = segments.len(),
            total_duration = manifest.total_duration,
            size = bytes.len(),
            "Book packaged"
        );

        Ok(PackageArchive {
            file_name: format!("{}.tar", book.id),
            manifest,
            bytes,
        })
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ApplicationError> {
    serde_json::to_vec_pretty(value)
        .map_err(|e| ApplicationError::internal(format!("encode package member: {}", e)))
}

fn archive_error(e: std::io::Error) -> ApplicationError {
    ApplicationError::internal(format!("build archive: {}", e))
}

/// 追加一个确定性的 tar 成员
fn append(
    builder: &mut tar::Builder<Vec<u8>>,
    path: &str,
    data: &[u8],
) -> Result<(), ApplicationError> {
    let mut header = tar::Header::new_ustar();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    builder
        .append_data(&mut header, path, data)
        .map_err(archive_error)
}
