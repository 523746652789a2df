//! Layered loading from files on disk.

use std::io::Write;

use nexus_config::load_layered_yaml;

#[test]
fn later_files_override_earlier_files() {
    let mut base = tempfile::NamedTempFile::new().unwrap();
    writeln!(base, "tickets:\n  number_prefix: \"TKT\"\n  number_width: 5").unwrap();
    let mut overlay = tempfile::NamedTempFile::new().unwrap();
    writeln!(overlay, "tickets:\n  number_prefix: \"OPS\"").unwrap();

    let base_path = base.path().to_str().unwrap().to_string();
    let overlay_path = overlay.path().to_str().unwrap().to_string();
    let loaded = load_layered_yaml(&[&base_path, &overlay_path]).unwrap();
    let settings = loaded.settings().unwrap();

    assert_eq!(settings.tickets.format(3), "OPS-00003");
}

#[test]
fn missing_file_reports_its_path() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}

#[test]
fn empty_document_yields_defaults() {
    let empty = tempfile::NamedTempFile::new().unwrap();
    let path = empty.path().to_str().unwrap().to_string();
    let settings = load_layered_yaml(&[&path]).unwrap().settings().unwrap();

    assert_eq!(settings.daemon.bind_addr, "127.0.0.1:5000");
    assert_eq!(settings.seed.masters().len(), 2);
}
