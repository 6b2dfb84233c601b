fn main() {
    autofill_service_lib::run()
}
