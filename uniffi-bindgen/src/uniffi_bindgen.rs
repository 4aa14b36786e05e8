//! Generates the Swift and Kotlin bindings for `scakit`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
