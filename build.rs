//! Build script for devmem.
//!
//! Prints build-time notes about the enabled backends and debug features.

use std::env;

fn main() {
    // Re-run if features change
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_GPU_CUDA");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_GPU_VULKAN");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");

    let cuda_enabled = env::var("CARGO_FEATURE_GPU_CUDA").is_ok();
    let vulkan_enabled = env::var("CARGO_FEATURE_GPU_VULKAN").is_ok();
    let debug_enabled = env::var("CARGO_FEATURE_DEBUG").is_ok();
    let diagnostics_enabled = env::var("CARGO_FEATURE_DIAGNOSTICS").is_ok();
    let parking_lot_enabled = env::var("CARGO_FEATURE_PARKING_LOT").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    // =========================================================================
    // Backends
    // =========================================================================

    if cuda_enabled {
        emit_info("CUDA backend enabled (cudarc driver API)");
        emit_note("The CUDA driver library must be present at runtime.");
        emit_note("  DeviceMemory::new(CudaBackend::new(0)?, DeviceConfig::from_env())");
    }

    if vulkan_enabled {
        emit_info("Vulkan backend enabled (host-visible buffers via ash)");
        emit_note("VulkanBackend borrows your ash::Device; keep it alive while the facade exists.");
    }

    if !cuda_enabled && !vulkan_enabled && !is_release {
        emit_note("Only the host-simulated backend is compiled in.");
        emit_note("Enable 'gpu-cuda' or 'gpu-vulkan' for hardware backends.");
    }

    // =========================================================================
    // Debug features
    // =========================================================================

    if debug_enabled {
        emit_info("Debug features enabled");
        emit_note("  - Fresh host-backend blocks poisoned with 0xAB");
        emit_note("  - Allocation backtraces in leak reports (DeviceConfig::with_backtraces)");

        if is_release {
            emit_warning("Debug features enabled in release build!");
            emit_note("Backtrace capture on every allocation is slow. Consider disabling for production.");
        }
    }

    if is_release && !diagnostics_enabled {
        emit_note("Diagnostics go to stderr only in debug builds; enable 'diagnostics' to keep them in release.");
    }

    if parking_lot_enabled {
        emit_info("Using parking_lot for mutexes");
    }
}

fn emit_info(msg: &str) {
    println!("cargo:warning=[devmem] {}", msg);
}

fn emit_note(msg: &str) {
    println!("cargo:warning=[devmem]    {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[devmem] WARNING: {}", msg);
}
