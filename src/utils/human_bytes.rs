/// Affichage lisible d'une taille en octets (puissances de 1024).
pub trait HumanBytes {
    fn human_bytes(&self) -> String;
}

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

fn format_bytes(size: f64) -> String {
    let mut scaled = size;
    let mut unit = None;
    for candidate in UNITS {
        if scaled.abs() < 1024.0 {
            break;
        }
        scaled /= 1024.0;
        unit = Some(candidate);
    }
    match unit {
        Some(unit) => format!("{scaled:.2} {unit}"),
        None => format!("{size} B"),
    }
}

macro_rules! impl_human_bytes {
    ($($t:ty),*) => {
        $(
            impl HumanBytes for $t {
                fn human_bytes(&self) -> String {
                    format_bytes(*self as f64)
                }
            }
        )*
    };
}

impl_human_bytes!(usize, u64, u32, isize, i64);

#[cfg(test)]
mod tests {
    use super::HumanBytes;

    #[test]
    fn small_sizes_stay_in_bytes() {
        assert_eq!(0usize.human_bytes(), "0 B");
        assert_eq!(1023usize.human_bytes(), "1023 B");
    }

    #[test]
    fn gpu_buffer_sizes() {
        // 1000 particules de 32 octets
        assert_eq!((1000usize * 32).human_bytes(), "31.25 KB");
        // texture RGBA 1024x1024
        assert_eq!((1024usize * 1024 * 4).human_bytes(), "4.00 MB");
        assert_eq!((3u64 << 40).human_bytes(), "3.00 TB");
    }

    #[test]
    fn signed_values_keep_their_sign() {
        assert_eq!((-1536i64).human_bytes(), "-1.50 KB");
    }
}
