//! Round trips through real files

use approx::assert_relative_eq;
use numbat_io::{load_npy, load_txt, save_npy, save_txt, Error, Printed, Result, TextOptions};
use numbat_tensor::{NdArray, Shape, StridedArray, Tensor};
use tempfile::tempdir;

#[test]
fn test_npy_file_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("grid.npy");

    let t = Tensor::from_fn([3, 4, 5], |i| (i[0] * 20 + i[1] * 5 + i[2]) as f32 * 0.5)?;
    save_npy(&path, &t)?;
    let back: Tensor<f32, 3> = load_npy(&path)?;
    assert_eq!(back, t);

    // Payload begins on the 64-byte boundary
    let bytes = std::fs::read(&path)?;
    assert_eq!(bytes.len(), 128 + 60 * 4);
    Ok(())
}

#[test]
fn test_npy_saves_selected_elements() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("picked.npy");

    let t = Tensor::from_vec([2, 3], vec![1i64, -2, 3, -4, 5, -6])?;
    let mask = t.iter().map(|&x| x > 0).collect::<Vec<_>>();
    let mask = Tensor::from_vec([2, 3], mask)?;
    save_npy(&path, &t.select_mask(&mask)?)?;

    let back: Tensor<i64, 1> = load_npy(&path)?;
    assert_eq!(back.as_slice(), &[1, 3, 5]);
    assert!(matches!(load_npy::<i32, 1, _>(&path), Err(Error::DtypeMismatch { .. })));
    Ok(())
}

#[test]
fn test_text_file_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("table.csv");

    let t = Tensor::from_vec([3, 2], vec![0.1, 0.2, 1.5, -3.0, 1e3, 7.25])?;
    let options = TextOptions::default().with_delimiter(", ").with_header("a, b");
    save_txt(&path, &t.transpose(), &options)?;

    let back: Tensor<f64, 2> = load_txt(&path, &options)?;
    assert_eq!(back.shape(), Shape::new([2, 3]));
    for (x, y) in back.iter().zip(t.transpose().iter()) {
        assert_relative_eq!(*x, *y);
    }
    assert!(std::fs::read_to_string(&path)?.starts_with("# a, b\n0.1, 1.5, 1000\n"));
    Ok(())
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_npy::<f64, 1, _>("/nonexistent/numbat.npy").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_printing_a_loaded_array() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("small.npy");
    save_npy(&path, &Tensor::from_vec([2, 2], vec![1u16, 20, 300, 4])?)?;
    let back: Tensor<u16, 2> = load_npy(&path)?;
    assert_eq!(Printed::new(&back).to_string(), "[[  1  20]\n [300   4]]");
    Ok(())
}
