use micro_form::reader::{boundary_from_content_type, FormOptions, FormOutcome, FormReader};
use micro_form::sink::{TempDirProvider, TempFileSink};
use micro_form::source::BytesSource;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const CONTENT_TYPE: &str = "multipart/form-data; boundary=----demo";

fn demo_body() -> Vec<u8> {
    let parts: [(&str, &[u8]); 4] = [
        ("content-disposition: form-data; name=\"user[name]\"\r\n", b"ada"),
        ("content-disposition: form-data; name=\"user[tags][]\"\r\n", b"parser"),
        ("content-disposition: form-data; name=\"user[tags][]\"\r\n", b"streaming"),
        (
            "content-disposition: form-data; name=\"avatar\"; filename=\"avatar.png\"\r\ncontent-type: image/png\r\n",
            b"not really a png",
        ),
    ];

    let mut body = Vec::new();
    for (headers, part_body) in parts {
        body.extend_from_slice(format!("------demo\r\n{headers}\r\n").as_bytes());
        body.extend_from_slice(part_body);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"------demo--\r\n");
    body
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::TRACE).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let boundary = boundary_from_content_type(CONTENT_TYPE).expect("demo content type carries a boundary");

    let reader = FormReader::new(
        BytesSource::new(demo_body()),
        TempFileSink,
        TempDirProvider::default(),
        FormOptions::default(),
    );

    match reader.parse(&boundary).await {
        Ok(FormOutcome::Complete(params)) => {
            info!("decoded parameter tree: {params:#?}");
        }
        Ok(FormOutcome::TooLarge) => {
            info!("body exceeded the byte budget");
        }
        Err(e) => {
            info!("parse failed: {e}");
        }
    }
}
