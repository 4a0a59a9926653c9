//! Source acquisition against a local HTTP server.

use std::fs;
use std::path::PathBuf;

use cpackman_lib::{HttpSource, Source, SourceError};

use super::common::{TestEnv, gcc, sha1, zlib, zlib_archive};

#[test]
fn zlib_is_fetched_once_and_survives_archive_deletion() {
  let env = TestEnv::new();
  let ws = env.workspace(gcc());
  let archive = zlib_archive();

  let mut server = mockito::Server::new();
  let _head = server.mock("HEAD", "/zlib-1.2.13.tar.gz").with_status(200).create();
  let get = server
    .mock("GET", "/zlib-1.2.13.tar.gz")
    .with_status(200)
    .with_body(&archive)
    .expect(1)
    .create();
  let url = format!("{}/zlib-1.2.13.tar.gz", server.url());

  let source: Source = HttpSource::new(&ws, zlib(), url.clone(), sha1(&archive)).into();
  let first = source.get_source().unwrap();

  let expected = ws.sources_dir().join("zlib-1.2.13");
  assert_eq!(first, expected);
  assert!(expected.join("zlib.h").is_file());
  assert_eq!(
    PathBuf::from(fs::read_to_string(ws.sources_dir().join("zlib-1.2.13.tar.gz.dn")).unwrap()),
    expected
  );

  fs::remove_file(ws.sources_dir().join("zlib-1.2.13.tar.gz")).unwrap();

  // A fresh descriptor, as in a later run of the tool.
  let again: Source = HttpSource::new(&ws, zlib(), url, sha1(&archive)).into();
  assert_eq!(again.get_source().unwrap(), expected);
  get.assert();
}

#[test]
fn wrong_digest_leaves_no_trace() {
  let env = TestEnv::new();
  let ws = env.workspace(gcc());
  let archive = zlib_archive();

  let mut server = mockito::Server::new();
  let _head = server.mock("HEAD", "/zlib-1.2.13.tar.gz").with_status(200).create();
  let _get = server
    .mock("GET", "/zlib-1.2.13.tar.gz")
    .with_status(200)
    .with_body(&archive)
    .create();
  let url = format!("{}/zlib-1.2.13.tar.gz", server.url());

  let source = HttpSource::new(&ws, zlib(), url, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
  let err = source.get_source().unwrap_err();

  match err {
    SourceError::ChecksumMismatch { expected, actual, .. } => {
      assert_eq!(expected, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
      assert_eq!(actual, sha1(&archive));
    }
    other => panic!("unexpected error: {other}"),
  }
  assert!(!ws.sources_dir().join("zlib-1.2.13").exists());
  assert!(!ws.sources_dir().join("zlib-1.2.13.tar.gz.dn").exists());
}

#[test]
fn server_filename_names_the_archive() {
  let env = TestEnv::new();
  let ws = env.workspace(gcc());
  let archive = zlib_archive();

  let mut server = mockito::Server::new();
  let _head = server
    .mock("HEAD", "/download/42")
    .with_status(200)
    .with_header("content-disposition", "attachment; filename=\"zlib-1.2.13.tar.gz\"")
    .create();
  let _get = server
    .mock("GET", "/download/42")
    .with_status(200)
    .with_body(&archive)
    .create();

  let source = HttpSource::new(&ws, zlib(), format!("{}/download/42", server.url()), sha1(&archive));
  let dir = source.get_source().unwrap();

  assert_eq!(dir, ws.sources_dir().join("zlib-1.2.13"));
  assert!(ws.sources_dir().join("zlib-1.2.13.tar.gz").is_file());
  assert!(!ws.sources_dir().join("42").exists());
}
