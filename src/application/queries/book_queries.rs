//! Book Queries

/// 获取书籍详情
#[derive(Debug, Clone)]
pub struct GetBook {
    pub book_id: String,
}

/// 列出所有书籍
#[derive(Debug, Clone)]
pub struct ListBooks;

/// 列出章节（按 number）
#[derive(Debug, Clone)]
pub struct ListChapters {
    pub book_id: String,
}

/// 列出片段（存储顺序）
#[derive(Debug, Clone)]
pub struct ListSegments {
    pub book_id: String,
}

/// 获取音色映射
#[derive(Debug, Clone)]
pub struct GetVoiceMap {
    pub book_id: String,
}

/// 获取处理进度
#[derive(Debug, Clone)]
pub struct GetProcessingStatus {
    pub book_id: String,
}

/// 获取片段音频
#[derive(Debug, Clone)]
pub struct GetSegmentAudio {
    pub book_id: String,
    pub segment_id: String,
}

/// 流式读取片段，`after` 为空时从头开始
#[derive(Debug, Clone)]
pub struct StreamSegments {
    pub book_id: String,
    pub after: Option<String>,
}

/// 打包已合成的书
#[derive(Debug, Clone)]
pub struct PackageBook {
    pub book_id: String,
}
