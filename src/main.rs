use chatbench::error::AppResult;

fn main() -> AppResult<()> {
    chatbench::entry::run()
}
