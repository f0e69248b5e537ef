use rand::Rng as _;

/// `len` random lowercase ASCII letters, for unique fixture names.
pub fn rand_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}
