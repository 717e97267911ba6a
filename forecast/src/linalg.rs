//! Small dense symmetric eigen-solver for the normal equations.

pub(crate) type Matrix<const N: usize> = [[f64; N]; N];

const MAX_SWEEPS: usize = 64;

/// Eigen-decomposition of a real symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(values, vectors)` where column `k` of `vectors` is the unit
/// eigenvector for `values[k]`. Only the symmetric part of `a` is meaningful.
pub(crate) fn symmetric_eigen<const N: usize>(mut a: Matrix<N>) -> ([f64; N], Matrix<N>) {
    let mut v = [[0.0; N]; N];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        let mut diag = 0.0;
        for p in 0..N {
            diag += a[p][p] * a[p][p];
            for q in (p + 1)..N {
                off += a[p][q] * a[p][q];
            }
        }
        if off <= f64::EPSILON * f64::EPSILON * diag || off == 0.0 {
            break;
        }

        for p in 0..N {
            for q in (p + 1)..N {
                let apq = a[p][q];
                if apq == 0.0 {
                    continue;
                }

                // Rotation angle that zeroes a[p][q]; the smaller root keeps it stable.
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + theta.hypot(1.0));
                let c = 1.0 / t.hypot(1.0);
                let s = t * c;

                for k in 0..N {
                    let (akp, akq) = (a[k][p], a[k][q]);
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..N {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut values = [0.0; N];
    for (i, value) in values.iter_mut().enumerate() {
        *value = a[i][i];
    }
    (values, v)
}
