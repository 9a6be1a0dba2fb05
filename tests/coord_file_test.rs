mod common;

use approx::assert_abs_diff_eq;
use bernese::bernese_errors::BerneseError;
use bernese::files::coord_file::{read_coord_file, CoordReadOptions, JoinKey};
use hifitime::{Epoch, TimeScale};
use nalgebra::Vector3;

use common::{assert_vector_close, data_path, gzip_fixture, utf8_tempdir};

#[test]
fn test_read_coord_file() {
    let coords = read_coord_file(&data_path("APR.CRD"), &CoordReadOptions::default()).unwrap();

    // the malformed BADX line is skipped
    assert_eq!(
        coords.keys().collect::<Vec<_>>(),
        ["ABCD 10001M001", "KLMN 10003M001", "WXYZ 10002M001"]
    );

    let abcd = &coords["ABCD 10001M001"];
    assert_eq!(abcd.id, 1);
    assert_eq!(abcd.code, "ABCD");
    assert_eq!(abcd.flag, "A");
    assert_eq!(abcd.datum.as_deref(), Some("IGS08"));
    assert_eq!(
        abcd.epoch,
        Some(Epoch::from_gregorian(2015, 10, 27, 12, 0, 0, 0, TimeScale::GPST))
    );
    assert_vector_close(
        &abcd.xyz,
        &Vector3::new(-4779518.1633, 436652.4653, -4186695.9337),
        1e-6,
    );
    assert!(abcd.vxyz.is_none());

    assert_eq!(coords["WXYZ 10002M001"].id, 4);
    assert_eq!(coords["WXYZ 10002M001"].flag, "");
}

#[test]
fn test_read_coord_file_by_code() {
    let options = CoordReadOptions::new().with_join_key(JoinKey::Code);
    let coords = read_coord_file(&data_path("APR.CRD"), &options).unwrap();
    assert_eq!(coords.keys().collect::<Vec<_>>(), ["ABCD", "KLMN", "WXYZ"]);
    assert_eq!(coords["KLMN"].name, "KLMN 10003M001");
}

#[test]
fn test_malformed_line_fails_without_skip_errors() {
    let options = CoordReadOptions::new().with_skip_errors(false);
    let error = read_coord_file(&data_path("APR.CRD"), &options).unwrap_err();
    assert!(matches!(error, BerneseError::RecordDecode(_)));
}

#[test]
fn test_read_velocities() {
    let options = CoordReadOptions::new().with_velocities(true);
    let coords = read_coord_file(&data_path("APR.CRD"), &options).unwrap();

    assert_vector_close(
        &coords["ABCD 10001M001"].vxyz.unwrap(),
        &Vector3::new(-0.0223, 0.0012, 0.0331),
        1e-12,
    );
    assert_vector_close(
        &coords["WXYZ 10002M001"].vxyz.unwrap(),
        &Vector3::new(0.0105, 0.0187, 0.0152),
        1e-12,
    );
    // no velocity line for this station
    assert!(coords["KLMN 10003M001"].vxyz.is_none());
}

#[test]
fn test_missing_velocity_file() {
    let path = data_path("FIN.CRD");

    let options = CoordReadOptions::new().with_velocities(true);
    let error = read_coord_file(&path, &options).unwrap_err();
    match error {
        BerneseError::VelocityLoad { path, .. } => assert!(path.as_str().ends_with("FIN.VEL")),
        other => panic!("unexpected error: {other}"),
    }

    let options = CoordReadOptions::new().with_try_velocities(true);
    let coords = read_coord_file(&path, &options).unwrap();
    assert_eq!(coords.len(), 3);
    assert!(coords.values().all(|station| station.vxyz.is_none()));
}

#[test]
fn test_explicit_velocity_path() {
    let options = CoordReadOptions::new().with_velocity_path(data_path("APR.VEL"));
    let coords = read_coord_file(&data_path("FIN.CRD"), &options).unwrap();
    assert!(coords["ABCD 10001M001"].vxyz.is_some());
    assert!(coords["QRST 10005M001"].vxyz.is_none());
}

#[test]
fn test_read_gzip_coord_file() {
    let (_dir, dir_path) = utf8_tempdir();
    let crd = gzip_fixture("APR.CRD", &dir_path, "APR.CRD.gz").unwrap();
    gzip_fixture("APR.VEL", &dir_path, "APR.VEL.gz").unwrap();

    let options = CoordReadOptions::new().with_velocities(true);
    let coords = read_coord_file(&crd, &options).unwrap();
    assert_eq!(coords.len(), 3);
    assert_abs_diff_eq!(coords["WXYZ 10002M001"].vxyz.unwrap().y, 0.0187, epsilon = 1e-12);
}

#[test]
fn test_invalid_datum_epoch() {
    let error = read_coord_file(&data_path("BADEPOCH.CRD"), &CoordReadOptions::default())
        .unwrap_err();
    match error {
        BerneseError::InvalidDatumEpoch { epoch, path } => {
            assert_eq!(epoch, "27-10-2015 12:00");
            assert!(path.as_str().ends_with("BADEPOCH.CRD"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_coord_file() {
    let error =
        read_coord_file(&data_path("NOPE.CRD"), &CoordReadOptions::default()).unwrap_err();
    assert!(matches!(error, BerneseError::Io { .. }));
}
