use std::io::Write;
use tempfile::tempdir;
use tractdist_core::Cloud;
use tractdist_io::*;
use tractdist_metrics::{compute_symmetric_distance, DEFAULT_FIELD};

fn tract(offset: f64) -> Cloud {
    let mut c: Cloud = (0..5).map(|i| [i as f64, offset, 0.0]).collect();
    c.lines = vec![vec![0, 1, 2], vec![2, 3, 4]];
    c
}

#[test]
fn annotated_vtk_keeps_geometry_and_distance_field() {
    let dir = tempdir().unwrap();
    let mut a = tract(0.0);
    let mut b = tract(2.0);
    let s = compute_symmetric_distance(&mut a, &mut b, true).unwrap();
    assert!((s.headline() - 2.0).abs() < 1e-12);

    let path = dir.path().join("a_annotated.vtk");
    let path = path.to_str().unwrap();
    write_auto(path, &a).unwrap();

    let back = read_auto(path).unwrap();
    assert_eq!(back.len(), 5);
    assert_eq!(back.x, a.x);
    assert_eq!(back.lines, a.lines);
    assert_eq!(back.attrs[DEFAULT_FIELD], vec![2.0; 5]);
}

#[test]
fn ply_carries_extra_properties() {
    let dir = tempdir().unwrap();
    let mut c = tract(1.5);
    c.set_attr("FA", vec![0.1, 0.2, 0.3, 0.4, 0.5]);
    let path = dir.path().join("cloud.ply");
    let path = path.to_str().unwrap();
    write_ply_ascii(path, &c).unwrap();

    let back = read_auto(path).unwrap();
    assert_eq!(back.len(), 5);
    assert_eq!(back.point(4), [4.0, 1.5, 0.0]);
    assert!((back.attrs["FA"][3] - 0.4).abs() < 1e-12);
}

#[test]
fn unknown_extension_is_sniffed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tract.dat");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "# vtk DataFile Version 3.0\nx\nASCII\nDATASET POLYDATA\nPOINTS 1 float\n3 4 0\n").unwrap();
    drop(f);
    let c = read_auto(path.to_str().unwrap()).unwrap();
    assert_eq!(c.point(0), [3.0, 4.0, 0.0]);

    let junk = dir.path().join("notes.txt");
    std::fs::write(&junk, "hello").unwrap();
    assert!(read_auto(junk.to_str().unwrap()).is_err());
}

#[test]
fn missing_file_reports_path() {
    let err = read_auto("/nonexistent/tract1.vtk").unwrap_err();
    assert!(format!("{err:#}").contains("tract1.vtk"));
}

#[test]
fn empty_polydata_loads_but_is_rejected_by_the_engine() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.vtk");
    std::fs::write(&path, "# vtk DataFile Version 3.0\nx\nASCII\nDATASET POLYDATA\nPOINTS 0 float\n").unwrap();
    let mut empty = read_vtk(path.to_str().unwrap()).unwrap();
    assert!(empty.is_empty());
    let mut other = tract(0.0);
    assert!(compute_symmetric_distance(&mut empty, &mut other, false).is_err());
}
