fn main() {
    cvr_telemetry_lib::run()
}
