use super::RemoteError;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Extracts a zip archive into `dest`, returning the files written.
///
/// Entries whose names would escape `dest` are skipped.
pub fn extract_zip(bytes: &[u8], dest: &Path) -> Result<Vec<PathBuf>, RemoteError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RemoteError::Archive(e.to_string()))?;
    fs::create_dir_all(dest).map_err(|source| RemoteError::Io {
        path: dest.display().to_string(),
        source,
    })?;

    let mut written = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| RemoteError::Archive(format!("entry #{index}: {e}")))?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let out_path = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|source| RemoteError::Io {
                path: out_path.display().to_string(),
                source,
            })?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|source| RemoteError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let mut out_file = fs::File::create(&out_path).map_err(|source| RemoteError::Io {
            path: out_path.display().to_string(),
            source,
        })?;
        std::io::copy(&mut entry, &mut out_file).map_err(|source| RemoteError::Io {
            path: out_path.display().to_string(),
            source,
        })?;
        written.push(out_path);
    }
    Ok(written)
}

/// Moves the file out of every artifact folder that holds exactly one file,
/// so single-file artifacts sit at the run directory root.
///
/// A folder named like its only file (`aw_info.json/aw_info.json`) is
/// replaced by the file itself. Folders whose file would collide with an
/// existing root entry are left in place.
pub fn flatten_single_file_artifacts(run_dir: &Path) -> Result<Vec<PathBuf>, RemoteError> {
    let io_err = |path: &Path, source: std::io::Error| RemoteError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut folders: Vec<PathBuf> = fs::read_dir(run_dir)
        .map_err(|e| io_err(run_dir, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();

    let mut flattened = Vec::new();
    for folder in folders {
        let entries: Vec<PathBuf> = fs::read_dir(&folder)
            .map_err(|e| io_err(&folder, e))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect();
        let [only] = entries.as_slice() else {
            continue;
        };
        if !only.is_file() {
            continue;
        }
        let Some(file_name) = only.file_name() else {
            continue;
        };
        let target = run_dir.join(file_name);

        if target == folder {
            let staging = run_dir.join(format!(".flatten-{}", file_name.to_string_lossy()));
            fs::rename(only, &staging).map_err(|e| io_err(only, e))?;
            fs::remove_dir(&folder).map_err(|e| io_err(&folder, e))?;
            fs::rename(&staging, &target).map_err(|e| io_err(&staging, e))?;
        } else {
            if target.exists() {
                continue;
            }
            fs::rename(only, &target).map_err(|e| io_err(only, e))?;
            fs::remove_dir(&folder).map_err(|e| io_err(&folder, e))?;
        }
        flattened.push(target);
    }
    Ok(flattened)
}

/// Replaces the contents of `dest` with freshly extracted artifacts.
///
/// Each archive is extracted into a folder named after its artifact inside a
/// sibling staging directory, flattened there, and only then swapped in for
/// `dest`. Files left by an earlier download of the same run never survive.
pub fn install_artifacts(archives: &[(String, Vec<u8>)], dest: &Path) -> Result<(), RemoteError> {
    let io_err = |path: &Path, source: std::io::Error| RemoteError::Io {
        path: path.display().to_string(),
        source,
    };
    let dir_name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "run".to_string());
    let staging = dest.with_file_name(format!(".{dir_name}.partial"));
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|e| io_err(&staging, e))?;
    }
    fs::create_dir_all(&staging).map_err(|e| io_err(&staging, e))?;

    let staged = archives
        .iter()
        .try_for_each(|(name, bytes)| extract_zip(bytes, &staging.join(name)).map(|_| ()))
        .and_then(|()| flatten_single_file_artifacts(&staging).map(|_| ()));
    if let Err(err) = staged {
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }

    if dest.exists() {
        fs::remove_dir_all(dest).map_err(|e| io_err(dest, e))?;
    }
    fs::rename(&staging, dest).map_err(|e| io_err(&staging, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::FileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            for (name, body) in files {
                writer.start_file(*name, options).expect("start file");
                writer.write_all(body.as_bytes()).expect("write entry");
            }
            writer.finish().expect("finish zip");
        }
        buffer.into_inner()
    }

    #[test]
    fn extracts_nested_entries() {
        let dir = tempdir().expect("tempdir");
        let bytes = zip_bytes(&[("agent-stdio.log", "hello"), ("nested/info.txt", "x")]);

        let written = extract_zip(&bytes, &dir.path().join("agent-stdio.log")).expect("extract");
        assert_eq!(written.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("agent-stdio.log/agent-stdio.log")).expect("read"),
            "hello"
        );
    }

    #[test]
    fn invalid_archives_are_reported() {
        let dir = tempdir().expect("tempdir");
        let err = extract_zip(b"not a zip", dir.path()).expect_err("invalid zip");
        assert!(matches!(err, RemoteError::Archive(_)));
    }

    #[test]
    fn single_file_folders_are_flattened_to_the_root() {
        let dir = tempdir().expect("tempdir");
        let run = dir.path();
        fs::create_dir_all(run.join("aw_info.json")).expect("mkdir");
        fs::write(run.join("aw_info.json/aw_info.json"), "{}").expect("write");
        fs::create_dir_all(run.join("agent_output")).expect("mkdir");
        fs::write(run.join("agent_output/agent_output.json"), "{}").expect("write");
        fs::create_dir_all(run.join("agent_outputs")).expect("mkdir");
        fs::write(run.join("agent_outputs/a.log"), "").expect("write");
        fs::write(run.join("agent_outputs/b.log"), "").expect("write");

        let flattened = flatten_single_file_artifacts(run).expect("flatten");
        assert_eq!(flattened.len(), 2);
        assert!(run.join("aw_info.json").is_file());
        assert!(run.join("agent_output.json").is_file());
        assert!(!run.join("agent_output").exists());
        assert!(run.join("agent_outputs").is_dir());
    }

    #[test]
    fn reinstalling_replaces_every_file_from_the_previous_download() {
        let dir = tempdir().expect("tempdir");
        let run = dir.path().join("run-1");
        let first = vec![
            (
                "aw_info.json".to_string(),
                zip_bytes(&[("aw_info.json", r#"{"engine_id":"codex"}"#)]),
            ),
            ("old-notes".to_string(), zip_bytes(&[("notes.log", "stale")])),
        ];
        install_artifacts(&first, &run).expect("first install");
        fs::write(run.join("run_summary.json"), "{}").expect("write summary");

        let second = vec![(
            "aw_info.json".to_string(),
            zip_bytes(&[("aw_info.json", r#"{"engine_id":"claude"}"#)]),
        )];
        install_artifacts(&second, &run).expect("second install");

        assert_eq!(
            fs::read_to_string(run.join("aw_info.json")).expect("read metadata"),
            r#"{"engine_id":"claude"}"#
        );
        assert!(!run.join("notes.log").exists());
        assert!(!run.join("run_summary.json").exists());
        assert!(!dir.path().join(".run-1.partial").exists());
    }

    #[test]
    fn failed_install_keeps_the_previous_download() {
        let dir = tempdir().expect("tempdir");
        let run = dir.path().join("run-2");
        let good = vec![("aw_info.json".to_string(), zip_bytes(&[("aw_info.json", "{}")]))];
        install_artifacts(&good, &run).expect("first install");

        let broken = vec![("agent-stdio.log".to_string(), b"not a zip".to_vec())];
        let err = install_artifacts(&broken, &run).expect_err("broken archive");

        assert!(matches!(err, RemoteError::Archive(_)));
        assert!(run.join("aw_info.json").is_file());
        assert!(!dir.path().join(".run-2.partial").exists());
    }
}
