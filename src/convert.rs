use ndarray::prelude::*;

use crate::error::Result;
use crate::mnist_dataset::{MnistItem, CHANNELS, HEIGHT, PIXELS, WIDTH};

/// Stacks a split into an image array (n, 28, 28, 1) and a label array (n,).
///
/// Index `i` of both arrays is item `i` of the input; nothing is reordered or dropped.
pub fn to_arrays(items: Vec<MnistItem>) -> Result<(Array4<u8>, Array1<u8>)> {
    let n = items.len();
    let mut pixels = Vec::with_capacity(n * PIXELS);
    let mut labels = Vec::with_capacity(n);

    for item in items {
        // iter() walks the image in logical (row-major) order whatever its strides
        pixels.extend(item.image.iter().copied());
        labels.push(item.label);
    }

    let images = Array4::from_shape_vec((n, HEIGHT, WIDTH, CHANNELS), pixels)?;
    Ok((images, Array1::from_vec(labels)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(fill: u8, label: u8) -> MnistItem {
        MnistItem::from_bytes(&[fill; PIXELS], label).unwrap()
    }

    #[test]
    fn preserves_pair_order() {
        let (images, labels) = to_arrays(vec![item(10, 4), item(20, 1), item(30, 4)]).unwrap();

        assert_eq!(images.dim(), (3, 28, 28, 1));
        assert_eq!(labels, array![4, 1, 4]);
        assert!(images.index_axis(Axis(0), 1).iter().all(|&p| p == 20));
        assert!(images.index_axis(Axis(0), 2).iter().all(|&p| p == 30));
    }

    #[test]
    fn transposed_images_are_stored_in_logical_order() {
        let bytes: Vec<u8> = (0..PIXELS).map(|i| (i % 251) as u8).collect();
        let original = MnistItem::from_bytes(&bytes, 0).unwrap();
        // Same logical image, but column-major in memory.
        let mut fortran = Array3::zeros(original.image.raw_dim().f());
        fortran.assign(&original.image);
        let (images, _) = to_arrays(vec![MnistItem {
            image: fortran,
            label: 0,
        }])
        .unwrap();

        assert_eq!(images.as_slice().unwrap(), &bytes[..]);
    }

    #[test]
    fn empty_split_has_zero_leading_dimension() {
        let (images, labels) = to_arrays(Vec::new()).unwrap();
        assert_eq!(images.shape(), &[0, 28, 28, 1]);
        assert_eq!(labels.len(), 0);
    }
}
