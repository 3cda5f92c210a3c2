fn main() {
    skinchat_lib::run()
}
