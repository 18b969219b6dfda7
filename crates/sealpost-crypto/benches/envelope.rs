use sealpost_crypto::{decrypt_with_key, derive_key, encrypt_with_key, reconcile, to_text};
use secrecy::SecretString;

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt(bencher: divan::Bencher, size: usize) {
    let key = derive_key(&SecretString::from("bench-password"));
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| encrypt_with_key(divan::black_box(&key), divan::black_box(&data)).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_decrypt(bencher: divan::Bencher, size: usize) {
    let key = derive_key(&SecretString::from("bench-password"));
    let envelope = encrypt_with_key(&key, &make_data(size)).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| decrypt_with_key(divan::black_box(&key), divan::black_box(&envelope)).unwrap());
}

/// Worst case for the reconciler: an armored envelope under the last variant.
#[divan::bench(args = [1024, 65536])]
fn bench_reconcile_armored_hex_variant(bencher: divan::Bencher, size: usize) {
    let password = SecretString::from("bench-password");
    let key = sealpost_crypto::KeyVariant::HexDigest
        .key_for(&password)
        .unwrap();
    let armored = to_text(&encrypt_with_key(&key, &make_data(size)).unwrap());
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| reconcile(divan::black_box(armored.as_bytes()), &password).unwrap());
}

fn main() {
    divan::main();
}
