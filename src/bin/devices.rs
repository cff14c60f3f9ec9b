// devices.rs — list every visible compute adapter and its limits.
//
// USAGE
//   cargo run --bin devices

use eigenlens::gpu::device;

fn main() {
    let reports = device::enumerate();
    println!("Got {} adapters.", reports.len());

    for (i, report) in reports.iter().enumerate() {
        let info = &report.info;
        let limits = &report.limits;
        println!("\n- Adapter {i}: {}", info.name);
        println!("  Backend: {:?}", info.backend);
        println!("  Device type: {:?}", info.device_type);
        println!("  Vendor id: {:#06x}", info.vendor);
        println!("  Device id: {:#06x}", info.device);
        println!("  Max buffer size: {}", limits.max_buffer_size);
        println!(
            "  Max storage binding size: {}",
            limits.max_storage_buffer_binding_size
        );
        println!(
            "  Max workgroup invocations: {}",
            limits.max_compute_invocations_per_workgroup
        );
        println!(
            "  Max workgroup size: {}x{}x{}",
            limits.max_compute_workgroup_size_x,
            limits.max_compute_workgroup_size_y,
            limits.max_compute_workgroup_size_z
        );
        println!(
            "  Max workgroups per dimension: {}",
            limits.max_compute_workgroups_per_dimension
        );
    }
}
