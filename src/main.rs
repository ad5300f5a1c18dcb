fn main() {
    distscan::app::startup::startup();
}
