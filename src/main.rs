fn main() {
    bracket_tracker_lib::run()
}
