fn main() {
    rodada_ui::mount();
}
