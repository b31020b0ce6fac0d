//! # alnkit
//!
//! 序列集合与多序列比对的数据引擎。
//!
//! 本 crate 提供：
//!
//! - **输入规范化**：FASTA 文本、字符串列表、名称映射、数值矩阵等统一为一种内部表示
//! - **序列集合**：可不等长的命名序列，支持筛选、去缺口、补齐
//! - **比对**：稠密编码矩阵与带注释的序列对象两种存储，算法只写一份
//! - **列操作**：按列选取与过滤、一致序列、频率谱、重抽样、滑动窗口
//! - **参考序列操作**：按参考行去缺口、复制缺口、按参考插入新序列
//!
//! ## 快速示例
//!
//! ```rust
//! use alnkit::prelude::*;
//!
//! let aln = SeqsBuilder::new()
//!     .moltype(MolType::Dna)
//!     .array_alignment(">a\nAC-GT\n>b\nACCGT\n>c\nATCGT")
//!     .unwrap();
//!
//! assert_eq!(aln.num_columns(), 5);
//! assert_eq!(aln.variable_positions(), vec![1, 2]);
//! assert_eq!(aln.majority_consensus(), "ACCGT");
//!
//! let trimmed = aln.omit_gap_pos(0.0, 1).unwrap().unwrap();
//! assert_eq!(trimmed.get_seq("a").unwrap().to_string(), "ACGT");
//! ```
//!
//! ## 模块说明
//!
//! - [`seqs`]：序列、输入规范化、序列集合
//! - [`align`]：比对及其列操作、参考序列操作
//! - [`io`]：FASTA 读写
//! - [`util`]：分子类型与序列间距离
//! - [`error`]：错误类型

pub mod align;
pub mod error;
pub mod io;
pub mod seqs;
pub mod util;

pub use align::Alignment;
pub use error::{AlnError, ErrorKind, Result};
pub use seqs::{Input, NamedSeqs, SeqsBuilder, Sequence, SequenceCollection};
pub use util::moltype::MolType;

/// The types and the shared trait most callers need.
pub mod prelude {
    pub use crate::align::Alignment;
    pub use crate::seqs::{Input, NamedSeqs, SeqsBuilder, Sequence, SequenceCollection};
    pub use crate::util::moltype::MolType;
}
