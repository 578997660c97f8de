//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a sample multi-module project, a local artifact
//! repository next to it, and helpers to run the CLI against both.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_sample_project();
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::poms;
    pub use super::TestFixture;
}

/// Descriptor texts for the sample project.
#[allow(dead_code)]
pub mod poms {
    /// Remote parent of the root, served from the local repository.
    pub const CORPORATE_PARENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>org.example</groupId>
  <artifactId>corporate-parent</artifactId>
  <version>7</version>
  <packaging>pom</packaging>
  <properties>
    <corporate.name>Example Corp</corporate.name>
    <shared>corporate</shared>
  </properties>
  <build>
    <pluginManagement>
      <plugins>
        <plugin>
          <artifactId>maven-surefire-plugin</artifactId>
          <version>3.2.5</version>
        </plugin>
      </plugins>
    </pluginManagement>
  </build>
</project>
"#;

    /// BOM imported by the root.
    pub const PLATFORM_BOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>org.example</groupId>
  <artifactId>platform-bom</artifactId>
  <version>2.0</version>
  <packaging>pom</packaging>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>junit</groupId>
        <artifactId>junit</artifactId>
        <version>4.13.2</version>
        <scope>test</scope>
      </dependency>
      <dependency>
        <groupId>org.eclipse.aether</groupId>
        <artifactId>aether-api</artifactId>
        <version>0.9.0</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>
"#;

    pub const ROOT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- Sample aggregator -->
<project xmlns="http://maven.apache.org/POM/4.0.0"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
         xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 https://maven.apache.org/xsd/maven-4.0.0.xsd">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.example</groupId>
    <artifactId>corporate-parent</artifactId>
    <version>7</version>
    <relativePath/>
  </parent>
  <artifactId>root</artifactId>
  <version>1.0</version>
  <packaging>pom</packaging>

  <modules>
    <module>module1</module>
  </modules>

  <properties>
    <aether.version>1.0.2.v20150114</aether.version>
    <shared>root</shared>
  </properties>

  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.eclipse.aether</groupId>
        <artifactId>aether-api</artifactId>
        <version>${aether.version}</version>
        <scope>provided</scope>
      </dependency>
      <dependency>
        <groupId>org.example</groupId>
        <artifactId>platform-bom</artifactId>
        <version>2.0</version>
        <type>pom</type>
        <scope>import</scope>
      </dependency>
    </dependencies>
  </dependencyManagement>

  <build>
    <pluginManagement>
      <plugins>
        <plugin>
          <artifactId>maven-surefire-plugin</artifactId>
          <configuration>
            <redirectTestOutputToFile>true</redirectTestOutputToFile>
          </configuration>
        </plugin>
      </plugins>
    </pluginManagement>
  </build>

  <profiles>
    <profile>
      <id>everything</id>
      <modules>
        <module>module1</module>
        <module>module2</module>
      </modules>
    </profile>
  </profiles>
</project>
"#;

    pub const MODULE1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.example</groupId>
    <artifactId>root</artifactId>
    <version>1.0</version>
  </parent>
  <artifactId>module1</artifactId>

  <dependencies>
    <dependency>
      <groupId>org.eclipse.aether</groupId>
      <artifactId>aether-api</artifactId>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
    </dependency>
  </dependencies>

  <build>
    <plugins>
      <plugin>
        <artifactId>maven-compiler-plugin</artifactId>
        <version>3.11.0</version>
        <configuration>
          <compilerArguments>
            <Xlint:-path/>
            <Xmaxerrs>100</Xmaxerrs>
          </compilerArguments>
        </configuration>
      </plugin>
      <plugin>
        <artifactId>maven-surefire-plugin</artifactId>
      </plugin>
    </plugins>
  </build>
</project>
"#;

    pub const MODULE2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.example</groupId>
    <artifactId>root</artifactId>
    <version>1.0</version>
  </parent>
  <artifactId>module2</artifactId>
  <properties>
    <shared>module2</shared>
  </properties>
</project>
"#;
}

/// A temporary directory holding a project under `project/` and a local
/// artifact repository under `repo/`.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add the sample project and the artifacts it needs.
    pub fn with_sample_project(self) -> Self {
        self.with_file("project/pom.xml", poms::ROOT)
            .with_file("project/module1/pom.xml", poms::MODULE1)
            .with_file("project/module2/pom.xml", poms::MODULE2)
            .with_file(
                "repo/org/example/corporate-parent/7/corporate-parent-7.pom",
                poms::CORPORATE_PARENT,
            )
            .with_file(
                "repo/org/example/platform-bom/2.0/platform-bom-2.0.pom",
                poms::PLATFORM_BOM,
            )
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory of the sample project's root descriptor.
    pub fn project(&self) -> PathBuf {
        self.temp_dir.path().join("project")
    }

    /// Root of the local artifact repository.
    pub fn repository(&self) -> PathBuf {
        self.temp_dir.path().join("repo")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.temp_dir.path().join("cache/resolution-cache.json")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A `pom-tree` command pointed at this fixture's repository and cache.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("pom-tree");
        cmd.current_dir(self.path())
            .env("POM_TREE_LOCAL_REPOSITORY", self.repository())
            .env("POM_TREE_CACHE", self.cache_file())
            .env_remove("POM_TREE_CONFIG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
