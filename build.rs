fn main() {
    // Only the Tauri shell needs the generated context
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
