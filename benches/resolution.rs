//! Benchmarks for discovery, effective-model resolution and rendering.
//!
//! The hierarchy benchmarks generate an aggregator with a growing number of
//! modules in a temporary directory. Each module declares dependencies that
//! are versioned only through the root's dependency management.

use std::fs;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pom_tree::descriptor::Descriptor;
use pom_tree::discovery::discover;
use pom_tree::escape::escape_configuration_colons;
use pom_tree::persist;
use pom_tree::resolution::ResolutionPass;
use pom_tree::resolver::LocalRepository;
use tempfile::TempDir;

const MANAGED: usize = 50;

fn root_pom(modules: usize) -> String {
    let mut pom = String::from(
        "<project xmlns=\"http://maven.apache.org/POM/4.0.0\">\n  <groupId>org.bench</groupId>\n  <artifactId>root</artifactId>\n  <version>1.0</version>\n  <packaging>pom</packaging>\n  <modules>\n",
    );
    for i in 0..modules {
        pom.push_str(&format!("    <module>module{}</module>\n", i));
    }
    pom.push_str("  </modules>\n  <properties>\n");
    for i in 0..MANAGED {
        pom.push_str(&format!("    <lib{}.version>{}.0</lib{}.version>\n", i, i, i));
    }
    pom.push_str("  </properties>\n  <dependencyManagement>\n    <dependencies>\n");
    for i in 0..MANAGED {
        pom.push_str(&format!(
            "      <dependency>\n        <groupId>org.lib</groupId>\n        <artifactId>lib{}</artifactId>\n        <version>${{lib{}.version}}</version>\n      </dependency>\n",
            i, i
        ));
    }
    pom.push_str("    </dependencies>\n  </dependencyManagement>\n</project>\n");
    pom
}

fn module_pom(index: usize) -> String {
    let mut pom = format!(
        "<project xmlns=\"http://maven.apache.org/POM/4.0.0\">\n  <parent>\n    <groupId>org.bench</groupId>\n    <artifactId>root</artifactId>\n    <version>1.0</version>\n  </parent>\n  <artifactId>module{}</artifactId>\n  <dependencies>\n",
        index
    );
    for i in (index % 5..MANAGED).step_by(5) {
        pom.push_str(&format!(
            "    <dependency>\n      <groupId>org.lib</groupId>\n      <artifactId>lib{}</artifactId>\n    </dependency>\n",
            i
        ));
    }
    pom.push_str(
        "  </dependencies>\n  <build>\n    <plugins>\n      <plugin>\n        <artifactId>maven-compiler-plugin</artifactId>\n        <version>3.11.0</version>\n        <configuration>\n          <compilerArguments>\n            <Xlint:-path/>\n          </compilerArguments>\n        </configuration>\n      </plugin>\n    </plugins>\n  </build>\n</project>\n",
    );
    pom
}

fn write_hierarchy(dir: &Path, modules: usize) {
    fs::write(dir.join("pom.xml"), root_pom(modules)).unwrap();
    for i in 0..modules {
        let module_dir = dir.join(format!("module{}", i));
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(module_dir.join("pom.xml"), module_pom(i)).unwrap();
    }
}

fn bench_effective_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("effective_hierarchy");

    for modules in [10usize, 50, 200] {
        let temp = TempDir::new().unwrap();
        write_hierarchy(temp.path(), modules);
        let repository = LocalRepository::new(temp.path().join("repo"));

        group.bench_with_input(BenchmarkId::from_parameter(modules), &modules, |b, _| {
            b.iter(|| {
                let mut pass = ResolutionPass::new(&repository);
                let tree = discover(&mut pass, temp.path()).unwrap();
                let mut resolved = 0;
                for descriptor in tree.all() {
                    resolved += pass.resolved_dependencies(descriptor).len();
                    resolved += pass.resolved_plugins(descriptor).len();
                }
                black_box(resolved)
            });
        });
    }

    group.finish();
}

fn bench_escape(c: &mut Criterion) {
    let text = module_pom(0);
    c.bench_function("escape_configuration_colons", |b| {
        b.iter(|| black_box(escape_configuration_colons(black_box(&text)).len()))
    });
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let original = root_pom(50);
    let path = Path::new("/bench/pom.xml");
    let descriptor = Descriptor::parse(path, &original).unwrap();

    group.bench_function("unchanged", |b| {
        b.iter(|| black_box(persist::render(&descriptor, &original).unwrap()))
    });

    let mut edited = descriptor.clone();
    edited
        .properties
        .insert("lib0.version".to_string(), "9.9".to_string());
    edited.dependency_management.remove(1);
    group.bench_function("edited", |b| {
        b.iter(|| black_box(persist::render(&edited, &original).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_effective_hierarchy, bench_escape, bench_render);
criterion_main!(benches);
