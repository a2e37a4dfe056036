pub mod csv;
pub mod excel;

use std::path::{Path, PathBuf};

/// 出力先がディレクトリ（または拡張子なし）ならファイル名を補う
pub fn output_path_for(output: &Path, file_name: &Path) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(file_name)
    } else {
        output.to_path_buf()
    }
}
