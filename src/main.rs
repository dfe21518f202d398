fn main() {
    task_tracker_lib::run()
}
