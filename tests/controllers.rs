mod common;

use std::io::Write as _;

use serde_json::json;

use common::{chat_reply, harness, Call, Reply};
use proxy_studio::app::{
    submit, AudioSource, ImageController, ImageInput, ImageSource, Outcome, Phase,
    SpeechController, SpeechInput, TextController, TextInput, ToolsController, ToolsInput,
    TtsController, TtsInput, VisionController, VisionInput,
};
use proxy_studio::proxy::{ContentPart, MessageContent};
use proxy_studio::recorder::RecordedAudio;
use proxy_studio::storage::{Category, KeyValueStore, ProcessingTime};

fn text_input(prompt: &str) -> TextInput {
    TextInput {
        model: "OpenAI/gpt-4o-mini".into(),
        prompt: prompt.into(),
    }
}

#[tokio::test]
async fn text_success_renders_breaks_and_saves_timing() {
    let h = harness(vec![chat_reply("line one\nline two")]);
    let outcome = submit(&TextController::new(h.ctx.clone()), text_input("hello")).await;

    let Outcome::Succeeded { html, elapsed_ms } = outcome else {
        panic!("expected success");
    };
    assert_eq!(html, "line one<br>line two");

    let pane = h.page.pane(Category::Text);
    assert_eq!(pane.result_html, html);
    assert_eq!(pane.timing, elapsed_ms.to_string());
    assert_eq!(pane.phase, Phase::Idle);

    let saved = h.store.list(Category::Text);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].content, html);
    assert_eq!(saved[0].processing_time, ProcessingTime::Millis(elapsed_ms));
    assert_eq!(saved[0].model.as_deref(), Some("OpenAI/gpt-4o-mini"));

    let requests = h.proxy.chat_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].messages[0].content,
        Some(MessageContent::Parts(vec![ContentPart::text("hello")]))
    );
}

#[tokio::test]
async fn failed_request_is_rendered_and_saved_with_unknown_time() {
    let h = harness(vec![Reply::Status(500)]);
    let outcome = submit(&TextController::new(h.ctx.clone()), text_input("hello")).await;

    let Outcome::Failed { html, message } = outcome else {
        panic!("expected failure");
    };
    assert_eq!(message, "API error: 500 Internal Server Error");
    assert_eq!(html, "An error occurred: API error: 500 Internal Server Error");

    let pane = h.page.pane(Category::Text);
    assert_eq!(pane.result_html, html);
    assert_eq!(pane.timing, "-");
    assert_eq!(pane.phase, Phase::Idle);

    let saved = h.store.list(Category::Text);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].processing_time, ProcessingTime::Unknown);
    assert!(saved[0].content.contains("500"));

    let stored = h.kv.get_item("textResults").unwrap().unwrap();
    assert!(stored.contains(r#""processingTime":"-""#), "{stored}");
}

#[tokio::test]
async fn connection_failure_text_reaches_the_result_area() {
    let h = harness(vec![Reply::Refused("connection refused".into())]);
    let outcome = submit(
        &ImageController::new(h.ctx.clone()),
        ImageInput::new("OpenAI/dall-e-3", "a fox"),
    )
    .await;

    assert!(matches!(outcome, Outcome::Failed { .. }));
    assert!(h
        .page
        .pane(Category::Image)
        .result_html
        .contains("connection refused"));
    assert_eq!(h.store.list(Category::Image).len(), 1);
}

#[tokio::test]
async fn whitespace_inputs_never_reach_the_proxy() {
    let h = harness(vec![]);

    let outcomes = vec![
        submit(&TextController::new(h.ctx.clone()), text_input("  \n\t")).await,
        submit(
            &ImageController::new(h.ctx.clone()),
            ImageInput::new("OpenAI/dall-e-3", "   "),
        )
        .await,
        submit(
            &TtsController::new(h.ctx.clone()),
            TtsInput {
                model: "OpenAI/tts-1".into(),
                voice: "alloy".into(),
                text: " ".into(),
            },
        )
        .await,
        submit(
            &VisionController::new(h.ctx.clone()),
            VisionInput {
                model: "OpenAI/gpt-4o-mini".into(),
                prompt: "\t".into(),
                image: Some(ImageSource::Url("https://example.com/a.png".into())),
            },
        )
        .await,
        submit(
            &ToolsController::new(h.ctx.clone()),
            ToolsInput {
                model: "OpenAI/gpt-4o-mini".into(),
                prompt: "  ".into(),
            },
        )
        .await,
    ];

    for outcome in &outcomes {
        assert!(matches!(outcome, Outcome::Rejected(_)), "{outcome:?}");
    }
    assert_eq!(h.proxy.call_count(), 0);
    assert!(h.store.get_all().is_empty());
    assert_eq!(h.page.pane(Category::Text).result_html, "Please enter a prompt.");
    assert_eq!(h.page.pane(Category::Tts).result_html, "Please enter some text.");
}

#[tokio::test]
async fn missing_media_is_rejected() {
    let h = harness(vec![]);

    let vision = submit(
        &VisionController::new(h.ctx.clone()),
        VisionInput {
            model: "OpenAI/gpt-4o-mini".into(),
            prompt: "what is this?".into(),
            image: ImageSource::pick(None, Some("  ")),
        },
    )
    .await;
    assert_eq!(
        vision,
        Outcome::Rejected("Please upload an image or enter an image URL.".into())
    );

    let speech = submit(
        &SpeechController::new(h.ctx.clone()),
        SpeechInput {
            model: "OpenAI/whisper-1".into(),
            language: "auto".into(),
            audio: None,
        },
    )
    .await;
    assert_eq!(speech, Outcome::Rejected("Please upload or record audio.".into()));
    assert_eq!(h.proxy.call_count(), 0);
}

#[tokio::test]
async fn image_result_is_saved_with_model_and_time() {
    let h = harness(vec![Reply::Json(json!({
        "created": 1,
        "data": [{"url": "https://img.example/fox.png"}]
    }))]);
    let outcome = submit(
        &ImageController::new(h.ctx.clone()),
        ImageInput::new("OpenAI/dall-e-3", "a fox"),
    )
    .await;
    assert!(matches!(outcome, Outcome::Succeeded { .. }));

    let calls = h.proxy.calls();
    let Call::Image(request) = &calls[0] else {
        panic!("expected an image request");
    };
    assert_eq!(request.n, 1);
    assert_eq!(request.size, "1024x1024");
    assert_eq!(request.quality, "standard");
    assert_eq!(request.response_format, "url");

    let all = h.store.get_all();
    let images = &all[&Category::Image];
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].index, 0);
    assert_eq!(images[0].category, Category::Image);
    assert_eq!(images[0].record.model.as_deref(), Some("OpenAI/dall-e-3"));
    assert!(matches!(images[0].record.processing_time, ProcessingTime::Millis(_)));
    assert_eq!(
        images[0].record.content,
        "<img src=\"https://img.example/fox.png\" alt=\"Generated image\">\
         <p>Image URL: https://img.example/fox.png</p>"
    );
}

#[tokio::test]
async fn image_without_url_fails() {
    let h = harness(vec![Reply::Json(json!({"data": []}))]);
    let outcome = submit(
        &ImageController::new(h.ctx.clone()),
        ImageInput::new("OpenAI/dall-e-3", "a fox"),
    )
    .await;
    let Outcome::Failed { message, .. } = outcome else {
        panic!("expected failure");
    };
    assert!(message.contains("no image URL"));
}

#[tokio::test]
async fn tts_embeds_playable_audio() {
    let h = harness(vec![Reply::Bytes(b"ID3".to_vec(), Some("audio/mpeg".into()))]);
    let outcome = submit(
        &TtsController::new(h.ctx.clone()),
        TtsInput {
            model: "OpenAI/tts-1".into(),
            voice: "nova".into(),
            text: "Hello there".into(),
        },
    )
    .await;

    let html = outcome.html().to_string();
    assert!(html.contains("<audio controls src=\"data:audio/mpeg;base64,SUQz\""));
    assert!(html.contains("download=\"speech_nova_"));
    assert!(html.contains(".mp3\" class=\"download-link\">Download</a>"));

    let calls = h.proxy.calls();
    let Call::Speech(request) = &calls[0] else {
        panic!("expected a speech request");
    };
    assert_eq!(request.response_format, "mp3");
    assert_eq!(request.voice, "nova");
}

#[tokio::test]
async fn vision_prefers_file_and_sends_data_uri() {
    let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    file.write_all(b"PNG").unwrap();

    let h = harness(vec![chat_reply("A cat.")]);
    let outcome = submit(
        &VisionController::new(h.ctx.clone()),
        VisionInput {
            model: "OpenAI/gpt-4o-mini".into(),
            prompt: "What is this?".into(),
            image: ImageSource::pick(
                Some(file.path().to_path_buf()),
                Some("https://example.com/ignored.jpg"),
            ),
        },
    )
    .await;
    assert_eq!(outcome.html(), "A cat.");

    // no fetch: the file won
    assert_eq!(h.proxy.call_count(), 1);
    let requests = h.proxy.chat_requests();
    let request = &requests[0];
    assert_eq!(
        request.messages[0].content,
        Some(MessageContent::Parts(vec![
            ContentPart::text("What is this?"),
            ContentPart::image_url("data:image/png;base64,UE5H".into()),
        ]))
    );
}

#[tokio::test]
async fn vision_url_is_fetched_with_its_content_type() {
    let h = harness(vec![
        Reply::Bytes(b"GIF".to_vec(), Some("image/gif".into())),
        chat_reply("An animation."),
    ]);
    submit(
        &VisionController::new(h.ctx.clone()),
        VisionInput {
            model: "OpenAI/gpt-4o-mini".into(),
            prompt: "Describe".into(),
            image: ImageSource::pick(None, Some("https://example.com/x")),
        },
    )
    .await;

    let calls = h.proxy.calls();
    assert!(matches!(&calls[0], Call::Fetch(url) if url == "https://example.com/x"));
    let requests = h.proxy.chat_requests();
    let request = &requests[0];
    let Some(MessageContent::Parts(parts)) = &request.messages[0].content else {
        panic!("expected content parts");
    };
    assert_eq!(parts[1], ContentPart::image_url("data:image/gif;base64,R0lG".into()));
}

fn recorded() -> RecordedAudio {
    RecordedAudio {
        bytes: b"RIFF".to_vec(),
        mime: "audio/wav".into(),
        file_name: "recorded_audio.wav".into(),
    }
}

#[tokio::test]
async fn speech_uses_transcription_endpoint_and_escapes_text() {
    let h = harness(vec![Reply::Json(json!({"text": "a < b"}))]);
    let outcome = submit(
        &SpeechController::new(h.ctx.clone()),
        SpeechInput {
            model: "OpenAI/whisper-1".into(),
            language: "ja".into(),
            audio: AudioSource::pick(Some(recorded()), None, Some("https://x/a.mp3")),
        },
    )
    .await;
    assert_eq!(outcome.html(), "a &lt; b");

    let calls = h.proxy.calls();
    assert_eq!(calls.len(), 1);
    let Call::Transcribe(request) = &calls[0] else {
        panic!("expected a transcription request");
    };
    assert_eq!(request.model, "OpenAI/whisper-1");
    assert_eq!(request.language.as_deref(), Some("ja"));
    assert_eq!(request.file.file_name, "recorded_audio.wav");
    assert_eq!(request.file.mime, "audio/wav");
}

#[tokio::test]
async fn speech_auto_language_is_omitted() {
    let h = harness(vec![
        Reply::Bytes(b"fLaC".to_vec(), Some("application/octet-stream".into())),
        Reply::Json(json!({"text": "hi"})),
    ]);
    submit(
        &SpeechController::new(h.ctx.clone()),
        SpeechInput {
            model: "OpenAI/whisper-1".into(),
            language: "auto".into(),
            audio: AudioSource::pick(None, None, Some("https://x/clip.flac")),
        },
    )
    .await;

    let calls = h.proxy.calls();
    let Call::Transcribe(request) = &calls[1] else {
        panic!("expected a transcription request");
    };
    assert_eq!(request.language, None);
    assert_eq!(request.file.file_name, "clip.flac");
    assert_eq!(request.file.mime, "audio/flac");
}

#[tokio::test]
async fn audio_chat_models_send_base64_audio_through_chat() {
    let h = harness(vec![chat_reply("Hello\nworld")]);
    let outcome = submit(
        &SpeechController::new(h.ctx.clone()),
        SpeechInput {
            model: "SambaNova/Qwen2-Audio-7B-Instruct".into(),
            language: "en".into(),
            audio: Some(AudioSource::Recorded(recorded())),
        },
    )
    .await;
    assert_eq!(outcome.html(), "Hello<br>world");

    let requests = h.proxy.chat_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].language.as_deref(), Some("en"));
    let Some(MessageContent::Parts(parts)) = &requests[0].messages[0].content else {
        panic!("expected content parts");
    };
    assert_eq!(
        parts[0],
        ContentPart::text("This is English audio. Please transcribe the contents of this recording.")
    );
    assert_eq!(parts[1], ContentPart::input_audio("UklGRg==".into(), "wav"));
}

#[tokio::test]
async fn similar_model_names_do_not_switch_to_chat() {
    let h = harness(vec![Reply::Json(json!({"text": "plain"}))]);
    submit(
        &SpeechController::new(h.ctx.clone()),
        SpeechInput {
            model: "sambanova/qwen2-audio-custom".into(),
            language: "auto".into(),
            audio: Some(AudioSource::Recorded(recorded())),
        },
    )
    .await;
    assert!(matches!(h.proxy.calls()[0], Call::Transcribe(_)));
}

#[tokio::test]
async fn overlapping_saves_both_land_in_order_of_completion() {
    let h = harness(vec![chat_reply("first"), chat_reply("second")]);
    let controller = TextController::new(h.ctx.clone());
    let (a, b) = tokio::join!(
        submit(&controller, text_input("one")),
        submit(&controller, text_input("two"))
    );
    assert!(matches!(a, Outcome::Succeeded { .. }));
    assert!(matches!(b, Outcome::Succeeded { .. }));

    let contents: Vec<_> = h
        .store
        .list(Category::Text)
        .into_iter()
        .map(|r| r.content)
        .collect();
    assert_eq!(contents.len(), 2);
    assert_eq!(h.page.pane(Category::Text).result_html, contents[1]);
}
